use std::{sync::Arc, time::Instant};

use gpui::{
    App, AppContext, Context, IntoElement, Render, RenderImage, TitlebarOptions, Window,
    WindowDecorations, WindowOptions,
};
use gpui_component::Root;

use crate::{controller::Controller, result_image::PendingImage};

mod main_view;
mod render_util;
mod titlebar;

const CAMERA_MIN_SIZE: (f32, f32) = (320.0, 240.0);
const DEFAULT_CAMERA_RATIO: f32 = 4.0 / 3.0;
const LEFT_PANEL_WIDTH: f32 = 520.0;

pub fn launch_ui(app: &mut App, controller: Controller, endpoint: String) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Gesture Canvas".into()),
            appears_transparent: true,
            traffic_light_position: None,
        }),
        window_decorations: Some(WindowDecorations::Client),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(controller, endpoint));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    controller: Controller,
    endpoint: String,
    preview: Option<Arc<RenderImage>>,
    preview_stamp: Option<Instant>,
    result: ResultImage,
}

/// Decoded form of the session's current image reference.
#[derive(Default)]
struct ResultImage {
    reference: Option<String>,
    pending: Option<PendingImage>,
    image: Option<Arc<RenderImage>>,
    error: Option<String>,
}

impl AppView {
    fn new(controller: Controller, endpoint: String) -> Self {
        Self {
            controller,
            endpoint,
            preview: None,
            preview_stamp: None,
            result: ResultImage::default(),
        }
    }

    fn sync_preview(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let next = match self.controller.preview() {
            Some((frame, _)) if Some(frame.timestamp) == self.preview_stamp => return,
            Some((frame, result)) => {
                let overlay = result
                    .map(|r| r.pixel_landmarks(frame.width, frame.height))
                    .unwrap_or_default();
                render_util::frame_to_image(frame, &overlay).map(|image| (frame.timestamp, image))
            }
            None if self.preview.is_none() => return,
            None => None,
        };

        match next {
            Some((stamp, image)) => {
                self.preview_stamp = Some(stamp);
                if let Some(old) = self.preview.replace(image) {
                    // Each frame is a new texture; release the previous one from the atlas.
                    cx.drop_image(old, Some(window));
                }
            }
            None => {
                self.preview_stamp = None;
                if let Some(old) = self.preview.take() {
                    cx.drop_image(old, Some(window));
                }
            }
        }
    }

    fn sync_result_image(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let reference = self.controller.state().image().map(str::to_string);
        if reference != self.result.reference {
            if let Some(old) = self.result.image.take() {
                cx.drop_image(old, Some(window));
            }
            self.result.error = None;
            self.result.pending = reference
                .as_deref()
                .map(|r| PendingImage::spawn(&self.endpoint, r));
            self.result.reference = reference;
        }

        let Some(pending) = self.result.pending.as_mut() else {
            return;
        };
        let Some(outcome) = pending.try_finish() else {
            return;
        };
        self.result.pending = None;
        match outcome.map(render_util::rgba_to_image) {
            Ok(Some(image)) => self.result.image = Some(image),
            Ok(None) => self.result.error = Some("Unsupported image buffer".to_string()),
            Err(err) => {
                log::error!("failed to load generated image: {err:#}");
                self.result.error = Some(format!("{err:#}"));
            }
        }
    }
}

impl Render for AppView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.controller.tick();
        self.sync_preview(window, cx);
        self.sync_result_image(window, cx);
        self.render_main(window, cx)
    }
}

impl Drop for AppView {
    fn drop(&mut self) {
        self.controller.shutdown();
    }
}
