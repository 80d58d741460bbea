use gpui::{
    AnyElement, Context, IntoElement, ObjectFit, ParentElement, SharedString, Styled, StyledImage,
    Window, div, img, px, relative,
};
use gpui_component::{
    ActiveTheme, Disableable, StyledExt,
    button::{Button, ButtonVariants},
    h_flex,
    tag::Tag,
    v_flex,
};

use super::{
    AppView, CAMERA_MIN_SIZE, DEFAULT_CAMERA_RATIO, LEFT_PANEL_WIDTH,
    titlebar::Pill,
};
use crate::session::{Lifecycle, ModelStatus, ResultKind};

impl AppView {
    pub(super) fn render_main(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> AnyElement {
        let titlebar = self.render_titlebar(self.status_pills(cx), window, cx);

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .child(titlebar)
            .child(
                h_flex()
                    .flex_1()
                    .gap_4()
                    .p_4()
                    .items_start()
                    .child(self.render_camera_panel(cx))
                    .child(self.render_generation_panel(cx)),
            )
            .into_any_element()
    }

    fn status_pills(&self, cx: &Context<'_, Self>) -> Vec<Pill> {
        let theme = cx.theme();
        let state = self.controller.state();

        let model = match state.model_status() {
            ModelStatus::Loading => Pill {
                color: theme.muted_foreground,
                icon: "○",
                text: "Model loading".into(),
            },
            ModelStatus::Ready => Pill {
                color: theme.success,
                icon: "●",
                text: "Model ready".into(),
            },
            ModelStatus::Failed => Pill {
                color: theme.danger,
                icon: "✗",
                text: "Model unavailable".into(),
            },
        };
        let (icon, text, color) = match state.lifecycle() {
            Lifecycle::Idle => ("○", "Idle", theme.muted_foreground),
            Lifecycle::Detecting => ("●", "Detecting", theme.success),
            Lifecycle::Generating => ("⟳", "Generating", theme.foreground),
        };
        vec![
            model,
            Pill {
                color,
                icon,
                text: text.into(),
            },
        ]
    }

    fn render_camera_panel(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let state = self.controller.state();
        let detecting = state.is_detecting();

        let ratio = self
            .controller
            .preview()
            .map(|(frame, _)| frame)
            .filter(|frame| frame.height > 0)
            .map(|frame| frame.width as f32 / frame.height as f32)
            .unwrap_or(DEFAULT_CAMERA_RATIO);
        let camera_height = (LEFT_PANEL_WIDTH / ratio).max(CAMERA_MIN_SIZE.1);

        let preview: AnyElement = match &self.preview {
            Some(image) => img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .rounded_t_lg()
                .into_any_element(),
            None => div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child(if detecting {
                    "Waiting for camera..."
                } else {
                    "Camera is off"
                })
                .into_any_element(),
        };

        let start_label = if detecting {
            "Detecting..."
        } else {
            "Start Gesture Detection"
        };
        let mut controls = h_flex().gap_2().child(
            Button::new(SharedString::from("start-detection"))
                .primary()
                .label(start_label)
                .disabled(!state.can_start_detection())
                .on_click(cx.listener(|this, _, _, cx| {
                    if let Err(err) = this.controller.start_detection() {
                        log::warn!("start detection rejected: {err}");
                    }
                    cx.notify();
                })),
        );
        if detecting {
            controls = controls.child(
                Button::new(SharedString::from("stop-detection"))
                    .outline()
                    .label("Stop")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.controller.stop_detection();
                        cx.notify();
                    })),
            );
        }

        v_flex()
            .w(px(LEFT_PANEL_WIDTH))
            .rounded_lg()
            .overflow_hidden()
            .bg(gpui::rgb(0x0f1419))
            .child(
                div()
                    .w_full()
                    .h(px(camera_height))
                    .min_w(px(CAMERA_MIN_SIZE.0))
                    .overflow_hidden()
                    .bg(gpui::rgb(0x000000))
                    .child(preview),
            )
            .child(
                v_flex()
                    .gap_3()
                    .p_3()
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(0xa0aab8))
                            .child(state.detector_status().to_string()),
                    )
                    .child(controls),
            )
            .into_any_element()
    }

    fn render_generation_panel(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let state = self.controller.state();
        let progress = (state.progress() / 100.0).clamp(0.0, 1.0) as f32;

        let mut panel = v_flex()
            .flex_1()
            .gap_3()
            .p_4()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                div()
                    .font_semibold()
                    .text_color(theme.foreground)
                    .child("Generation"),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.muted_foreground)
                    .child(if state.status().is_empty() {
                        "Show a gesture to generate an image".to_string()
                    } else {
                        state.status().to_string()
                    }),
            )
            .child(
                div()
                    .w_full()
                    .h(px(6.0))
                    .rounded_full()
                    .bg(gpui::rgba(0xffffff14))
                    .child(
                        div()
                            .h_full()
                            .w(relative(progress))
                            .rounded_full()
                            .bg(theme.primary),
                    ),
            );

        if let Some(banner) = state.result() {
            panel = panel.child(match banner.kind {
                ResultKind::Error => Tag::danger()
                    .rounded_full()
                    .child(banner.text.clone())
                    .into_any_element(),
                ResultKind::Success => div()
                    .text_sm()
                    .text_color(theme.success)
                    .child(banner.text.clone())
                    .into_any_element(),
                ResultKind::Info => div()
                    .text_sm()
                    .text_color(theme.foreground)
                    .child(banner.text.clone())
                    .into_any_element(),
            });
        }

        let artwork: AnyElement = if let Some(image) = &self.result.image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element()
        } else {
            let caption = if let Some(err) = &self.result.error {
                format!("Could not display image: {err}")
            } else if self.result.pending.is_some() {
                "Loading image...".to_string()
            } else {
                "No image yet".to_string()
            };
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_xs()
                .text_color(gpui::rgb(0x4a5568))
                .child(caption)
                .into_any_element()
        };

        panel
            .child(
                div()
                    .w_full()
                    .h(px(420.0))
                    .rounded_lg()
                    .overflow_hidden()
                    .bg(gpui::rgb(0x0f1419))
                    .child(artwork),
            )
            .into_any_element()
    }
}
