use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{classifier::ClassifierOptions, stream::DEFAULT_ENDPOINT, types::Delegate};

pub const CONFIG_FILE: &str = "gesture-canvas.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server-push endpoint; the prompt is appended as a query parameter.
    pub endpoint: String,
    pub delegate: Delegate,
    pub camera_index: u32,
    pub recognizer_interval_ms: u64,
    pub model_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            delegate: Delegate::Gpu,
            camera_index: 0,
            recognizer_interval_ms: 100,
            model_dir: PathBuf::from("models"),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config: {}", path.display()))?;
        serde_json::from_slice(&bytes).context("decode config JSON")
    }

    /// Reads `path` when it exists, then applies environment overrides.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    log::info!("loaded config from {}", path.display());
                    config
                }
                Err(err) => {
                    log::warn!("ignoring config {}: {err:#}", path.display());
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("GESTURE_CANVAS_ENDPOINT") {
            if endpoint.trim().is_empty() {
                log::warn!("GESTURE_CANVAS_ENDPOINT is empty, keeping {}", self.endpoint);
            } else {
                self.endpoint = endpoint.trim().to_string();
            }
        }
        if let Some(value) = lookup("GESTURE_CANVAS_DELEGATE") {
            match Delegate::parse(&value) {
                Some(delegate) => self.delegate = delegate,
                None => log::warn!("unknown delegate `{value}`, expected cpu or gpu"),
            }
        }
        if let Some(value) = lookup("GESTURE_CANVAS_CAMERA") {
            match value.trim().parse() {
                Ok(index) => self.camera_index = index,
                Err(_) => log::warn!("invalid camera index `{value}`"),
            }
        }
        if let Some(dir) = lookup("GESTURE_CANVAS_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.model_dir = PathBuf::from(dir.trim());
            }
        }
    }

    pub fn recognizer_interval(&self) -> Duration {
        Duration::from_millis(self.recognizer_interval_ms)
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions::in_dir(&self.model_dir, self.delegate)
    }
}
