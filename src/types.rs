use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Solid black frame, mostly useful for tests and placeholders.
    pub fn blank(width: u32, height: u32) -> Self {
        let mut rgba = vec![0u8; width as usize * height as usize * 4];
        for px in rgba.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self::new(rgba, width, height)
    }
}

/// Landmark coordinates are normalized to the frame: x and y in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub category_name: String,
    pub score: f32,
}

impl Category {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            category_name: name.into(),
            score,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandDetection {
    /// Ranked by score, highest first.
    pub gestures: Vec<Category>,
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecognitionResult {
    pub hands: Vec<HandDetection>,
}

impl RecognitionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_hand(hand: HandDetection) -> Self {
        Self { hands: vec![hand] }
    }

    /// Landmarks of every hand projected into frame pixel space.
    pub fn pixel_landmarks(&self, width: u32, height: u32) -> Vec<Vec<(f32, f32)>> {
        self.hands
            .iter()
            .map(|hand| {
                hand.landmarks
                    .iter()
                    .map(|lm| (lm.x * width as f32, lm.y * height as f32))
                    .collect()
            })
            .collect()
    }
}

/// Execution preference handed to the classifier at initialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    Cpu,
    #[default]
    Gpu,
}

impl Delegate {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => Some(Delegate::Cpu),
            "gpu" => Some(Delegate::Gpu),
            _ => None,
        }
    }
}
