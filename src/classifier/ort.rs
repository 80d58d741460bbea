use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ndarray::Array2;
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};

use super::{
    ClassifierLoader, ClassifierOptions, GestureClassifier,
    preprocess::{self, HANDPOSE_INPUT_SIZE},
};
use crate::{
    model_download::ensure_model_ready,
    types::{Category, Delegate, Frame, HandDetection, Handedness, RecognitionResult},
};

const MIN_HAND_CONFIDENCE: f32 = 0.2;

// Output order of the landmark classifier (HaGRID classes).
const CLASSIFIER_CLASSES: [&str; 34] = [
    "call",
    "dislike",
    "fist",
    "four",
    "grabbing",
    "grip",
    "hand_heart",
    "hand_heart2",
    "holy",
    "like",
    "little_finger",
    "middle_finger",
    "mute",
    "no_gesture",
    "ok",
    "one",
    "palm",
    "peace",
    "peace_inverted",
    "point",
    "rock",
    "stop",
    "stop_inverted",
    "take_picture",
    "three",
    "three2",
    "three3",
    "three_gun",
    "thumb_index",
    "thumb_index2",
    "timeout",
    "two_up",
    "two_up_inverted",
    "xsign",
];

/// Reported gesture vocabulary, in MediaPipe naming.
pub const GESTURE_LABELS: [&str; 8] = [
    "None",
    "Closed_Fist",
    "Open_Palm",
    "Pointing_Up",
    "Thumb_Down",
    "Thumb_Up",
    "Victory",
    "ILoveYou",
];

fn gesture_label(class: &str) -> &'static str {
    match class {
        "fist" => "Closed_Fist",
        "palm" | "stop" => "Open_Palm",
        "one" => "Pointing_Up",
        "dislike" => "Thumb_Down",
        "like" => "Thumb_Up",
        "peace" | "two_up" => "Victory",
        "rock" => "ILoveYou",
        _ => "None",
    }
}

/// Softmax over classifier logits folded into `GESTURE_LABELS`, best first.
/// A label scores as its most likely source class, so the many classes that
/// fold into `None` do not pool their probability.
pub fn rank_gestures(logits: &[f32]) -> Vec<Category> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exp.iter().sum();

    let mut scores = [0.0f32; GESTURE_LABELS.len()];
    if sum > 0.0 && sum.is_finite() {
        for (class, weight) in CLASSIFIER_CLASSES.iter().zip(exp) {
            let label = gesture_label(class);
            if let Some(idx) = GESTURE_LABELS.iter().position(|l| *l == label) {
                scores[idx] = scores[idx].max(weight / sum);
            }
        }
    }

    let mut ranked: Vec<Category> = GESTURE_LABELS
        .iter()
        .zip(scores)
        .map(|(label, score)| Category::new(*label, score))
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Downloads (if needed) and opens both ONNX models.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrtLoader;

impl ClassifierLoader for OrtLoader {
    fn initialize(&self, options: &ClassifierOptions) -> Result<Box<dyn GestureClassifier>> {
        for asset in [&options.handpose, &options.gesture] {
            ensure_model_ready(asset, |evt| log::debug!("{}: {evt:?}", asset.name))?;
        }

        let handpose = open_session(&options.handpose.path, options.delegate)?;
        let gesture = open_session(&options.gesture.path, options.delegate)?;
        log::info!(
            "gesture models ready: {} and {}",
            options.handpose.path.display(),
            options.gesture.path.display()
        );

        Ok(Box::new(OrtClassifier { handpose, gesture }))
    }
}

fn open_session(path: &Path, delegate: Delegate) -> Result<Session> {
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?;
    if delegate == Delegate::Gpu {
        // Registration failure falls back to the CPU provider.
        builder = builder.with_execution_providers([CUDAExecutionProvider::default().build()])?;
    }
    builder
        .commit_from_file(path)
        .with_context(|| format!("failed to load ORT session from {}", path.display()))
}

pub struct OrtClassifier {
    handpose: Session,
    gesture: Session,
}

impl OrtClassifier {
    fn classify(&mut self, raw_landmarks: &[[f32; 3]]) -> Result<Vec<Category>> {
        let Some(features) = preprocess::classifier_features(raw_landmarks) else {
            return Ok(rank_gestures(&[]));
        };
        let input = Array2::from_shape_vec((1, features.len()), features)
            .map_err(|err| anyhow!("failed to shape classifier input: {err}"))?;
        let outputs = self
            .gesture
            .run(ort::inputs![Tensor::from_array(input)?])
            .context("gesture classifier inference failed")?;
        let logits: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        Ok(rank_gestures(&logits))
    }
}

impl GestureClassifier for OrtClassifier {
    fn recognize_for_video(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<RecognitionResult> {
        let (input, letterbox) = preprocess::letterbox_tensor(frame, HANDPOSE_INPUT_SIZE)?;
        let outputs = self
            .handpose
            .run(ort::inputs![Tensor::from_array(input)?])
            .context("handpose inference failed")?;
        if outputs.len() < 2 {
            return Err(anyhow!("handpose model returned {} outputs", outputs.len()));
        }

        let flat: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        let raw_landmarks = preprocess::decode_landmarks(&flat)?;
        let first_scalar = |idx: usize| -> f32 {
            outputs[idx]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        };
        let confidence = first_scalar(1);
        let handedness = if outputs.len() > 2 {
            first_scalar(2)
        } else {
            0.0
        };
        drop(outputs);

        if confidence < MIN_HAND_CONFIDENCE {
            log::trace!("frame {timestamp_ms}: no hand (confidence {confidence:.2})");
            return Ok(RecognitionResult::empty());
        }

        let gestures = self.classify(&raw_landmarks)?;
        Ok(RecognitionResult::with_hand(HandDetection {
            gestures,
            landmarks: preprocess::project_landmarks(&raw_landmarks, &letterbox),
            handedness: if handedness >= 0.5 {
                Handedness::Right
            } else if handedness > 0.0 {
                Handedness::Left
            } else {
                Handedness::Unknown
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logits_with(class: &str, value: f32) -> Vec<f32> {
        CLASSIFIER_CLASSES
            .iter()
            .map(|c| if *c == class { value } else { 0.0 })
            .collect()
    }

    fn logits_for(class: &str) -> Vec<f32> {
        logits_with(class, 8.0)
    }

    fn class_index(class: &str) -> usize {
        CLASSIFIER_CLASSES.iter().position(|c| *c == class).unwrap()
    }

    #[test]
    fn every_prompted_gesture_is_reachable() {
        for label in crate::prompts::known_gestures() {
            assert!(
                CLASSIFIER_CLASSES.iter().any(|c| gesture_label(c) == label),
                "{label} has no source class"
            );
        }
    }

    #[test]
    fn ranks_the_dominant_class_first() {
        let ranked = rank_gestures(&logits_for("like"));
        assert_eq!(ranked[0].category_name, "Thumb_Up");
        assert!(ranked[0].score > 0.9);
    }

    #[test]
    fn clear_class_beats_the_combined_none_mass() {
        // like ~0.18; the classes folded into None add up to ~0.62.
        let ranked = rank_gestures(&logits_with("like", 2.0));
        assert_eq!(ranked[0].category_name, "Thumb_Up");
        assert!((ranked[0].score - 0.183).abs() < 1e-3);
        let none = ranked.iter().find(|c| c.category_name == "None").unwrap();
        assert!(none.score < 0.03);
    }

    #[test]
    fn merged_classes_take_their_best_member() {
        let mut logits = vec![0.0; CLASSIFIER_CLASSES.len()];
        logits[class_index("palm")] = 3.0;
        logits[class_index("stop")] = 3.0;
        logits[class_index("fist")] = 3.5;
        let ranked = rank_gestures(&logits);
        assert_eq!(ranked[0].category_name, "Closed_Fist");
        assert_eq!(ranked[1].category_name, "Open_Palm");

        let others = (CLASSIFIER_CLASSES.len() - 3) as f32;
        let total = 2.0 * 3.0f32.exp() + 3.5f32.exp() + others;
        assert!((ranked[1].score - 3.0f32.exp() / total).abs() < 1e-4);
    }

    #[test]
    fn empty_logits_rank_everything_zero() {
        let ranked = rank_gestures(&[]);
        assert_eq!(ranked.len(), GESTURE_LABELS.len());
        assert!(ranked.iter().all(|c| c.score == 0.0));
    }
}
