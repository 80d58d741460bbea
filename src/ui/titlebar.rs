use gpui::{
    AnyElement, Context, Hsla, InteractiveElement, IntoElement, ParentElement, Styled, Window,
    WindowControlArea, div, px,
};
use gpui_component::h_flex;

use super::AppView;

/// A short colored status shown in the titlebar.
pub(super) struct Pill {
    pub color: Hsla,
    pub icon: &'static str,
    pub text: String,
}

impl AppView {
    pub(super) fn render_titlebar(
        &self,
        pills: Vec<Pill>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let mut status = h_flex().gap_3().pl(px(80.0)).pr_3().h_full().items_center();
        for pill in pills {
            status = status.child(
                div()
                    .px_2()
                    .py_0p5()
                    .rounded_md()
                    .bg(gpui::rgba(0x00000033))
                    .text_xs()
                    .text_color(pill.color)
                    .child(format!("{} {}", pill.icon, pill.text)),
            );
        }

        h_flex()
            .window_control_area(WindowControlArea::Drag)
            .h(px(32.0))
            .w_full()
            .items_center()
            .justify_between()
            .bg(gpui::rgb(0x1a2332))
            .child(status)
            .child(self.render_window_controls(window, cx))
            .into_any_element()
    }

    #[cfg(target_os = "macos")]
    fn render_window_controls(&self, _window: &mut Window, _cx: &mut Context<'_, Self>) -> AnyElement {
        // Traffic lights are drawn by the system.
        div().into_any_element()
    }

    #[cfg(not(target_os = "macos"))]
    fn render_window_controls(&self, window: &mut Window, _cx: &mut Context<'_, Self>) -> AnyElement {
        let maximize_glyph = if window.is_maximized() { "❐" } else { "□" };

        h_flex()
            .gap_1()
            .px_2()
            .child(control_button(
                "window-minimize",
                "─",
                WindowControlArea::Min,
                gpui::rgb(0x1f2428).into(),
            ))
            .child(control_button(
                "window-maximize",
                maximize_glyph,
                WindowControlArea::Max,
                gpui::rgb(0x1f2428).into(),
            ))
            .child(control_button(
                "window-close",
                "×",
                WindowControlArea::Close,
                gpui::rgb(0xe81123).into(),
            ))
            .into_any_element()
    }
}

#[cfg(not(target_os = "macos"))]
fn control_button(
    id: &'static str,
    glyph: &'static str,
    area: WindowControlArea,
    hover_bg: Hsla,
) -> impl IntoElement {
    div()
        .id(id)
        .size(px(28.0))
        .flex()
        .items_center()
        .justify_center()
        .rounded_md()
        .cursor_pointer()
        .window_control_area(area)
        .hover(move |s| s.bg(hover_bg))
        .text_sm()
        .text_color(gpui::rgb(0xc9d1d9))
        .child(glyph)
}
