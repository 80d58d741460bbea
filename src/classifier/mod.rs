//! Gesture classification seam.
//!
//! The detection coordinator only talks to [`GestureClassifier`]; the concrete
//! model stack lives behind [`ClassifierLoader`] so it can be swapped for a fake
//! in tests or for another vendor.

pub mod ort;
pub mod preprocess;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use anyhow::anyhow;
use crossbeam_channel::{Receiver, TryRecvError, bounded};

use crate::{
    model_download::ModelAsset,
    types::{Category, Delegate, Frame, RecognitionResult},
};

pub use self::ort::OrtLoader;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifierOptions {
    pub handpose: ModelAsset,
    pub gesture: ModelAsset,
    pub delegate: Delegate,
}

impl ClassifierOptions {
    pub fn in_dir(model_dir: &Path, delegate: Delegate) -> Self {
        Self {
            handpose: ModelAsset::handpose(model_dir),
            gesture: ModelAsset::gesture_classifier(model_dir),
            delegate,
        }
    }

    pub fn model_dir(&self) -> PathBuf {
        self.handpose
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

pub trait GestureClassifier: Send {
    /// `timestamp_ms` must increase strictly between calls.
    fn recognize_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: u64,
    ) -> anyhow::Result<RecognitionResult>;
}

pub trait ClassifierLoader: Send + Sync {
    fn initialize(&self, options: &ClassifierOptions)
    -> anyhow::Result<Box<dyn GestureClassifier>>;
}

/// Highest scoring category of the first detected hand.
pub fn top_gesture(result: &RecognitionResult) -> Option<&Category> {
    result.hands.first()?.gestures.iter().max_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

type LoadResult = anyhow::Result<Box<dyn GestureClassifier>>;

/// Classifier initialization running off the UI thread.
pub struct ModelLoad {
    rx: Receiver<LoadResult>,
    _handle: Option<thread::JoinHandle<()>>,
}

impl ModelLoad {
    pub fn spawn(loader: Arc<dyn ClassifierLoader>, options: ClassifierOptions) -> Self {
        let (tx, rx) = bounded(1);
        let handle = thread::spawn(move || {
            log::info!(
                "loading gesture models from {} ({:?} delegate)",
                options.model_dir().display(),
                options.delegate
            );
            let _ = tx.send(loader.initialize(&options));
        });
        Self {
            rx,
            _handle: Some(handle),
        }
    }

    /// An already resolved load.
    pub fn finished(result: LoadResult) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(result);
        Self { rx, _handle: None }
    }

    /// Non-blocking; `Some` exactly once.
    pub fn try_finish(&mut self) -> Option<LoadResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(anyhow!("model loader exited early"))),
        }
    }
}
