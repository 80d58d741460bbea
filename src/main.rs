#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::{path::Path, sync::Arc};

use anyhow::Result;
use gesture_canvas::{
    Controller,
    camera::NokhwaCamera,
    classifier::{ModelLoad, OrtLoader},
    config::{AppConfig, CONFIG_FILE},
    coordinator::DetectionCoordinator,
    stream::SseBackend,
    ui,
};
use gpui::Application;

fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::load_or_default(Path::new(CONFIG_FILE));
    log::info!("generation endpoint: {}", config.endpoint);

    let backend = SseBackend::new(config.endpoint.clone())?;
    let model = ModelLoad::spawn(Arc::new(OrtLoader), config.classifier_options());
    let coordinator = DetectionCoordinator::new(
        Box::new(NokhwaCamera::new(config.camera_index)),
        model,
        config.recognizer_interval(),
    );
    let controller = Controller::new(coordinator, Box::new(backend));
    let endpoint = config.endpoint;

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, controller, endpoint) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
