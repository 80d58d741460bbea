use std::time::{Duration, Instant};

use crate::{
    camera::{CameraSource, MediaStream},
    classifier::{GestureClassifier, ModelLoad, top_gesture},
    error::CameraError,
    types::{Frame, RecognitionResult},
};

enum ClassifierSlot {
    Loading(ModelLoad),
    Ready(Box<dyn GestureClassifier>),
    Failed,
}

/// Model load outcome, reported once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelEvent {
    Ready,
    Failed(String),
}

/// Owns the camera while detecting and runs one classifier pass per poll.
pub struct DetectionCoordinator {
    camera: Box<dyn CameraSource>,
    stream: Option<Box<dyn MediaStream>>,
    classifier: ClassifierSlot,
    running: bool,
    frame_interval: Duration,
    last_processed: Option<Instant>,
    clock: Instant,
    last_timestamp_ms: Option<u64>,
    latest_frame: Option<Frame>,
    latest_result: Option<RecognitionResult>,
}

impl DetectionCoordinator {
    pub fn new(camera: Box<dyn CameraSource>, model: ModelLoad, frame_interval: Duration) -> Self {
        Self {
            camera,
            stream: None,
            classifier: ClassifierSlot::Loading(model),
            running: false,
            frame_interval,
            last_processed: None,
            clock: Instant::now(),
            last_timestamp_ms: None,
            latest_frame: None,
            latest_result: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_camera(&self) -> bool {
        self.stream.is_some()
    }

    pub fn model_ready(&self) -> bool {
        matches!(self.classifier, ClassifierSlot::Ready(_))
    }

    pub fn latest_frame(&self) -> Option<&Frame> {
        self.latest_frame.as_ref()
    }

    pub fn latest_result(&self) -> Option<&RecognitionResult> {
        self.latest_result.as_ref()
    }

    /// Checks on the background model load.
    pub fn poll_model(&mut self) -> Option<ModelEvent> {
        let ClassifierSlot::Loading(load) = &mut self.classifier else {
            return None;
        };
        match load.try_finish()? {
            Ok(classifier) => {
                log::info!("gesture classifier ready");
                self.classifier = ClassifierSlot::Ready(classifier);
                Some(ModelEvent::Ready)
            }
            Err(err) => {
                log::error!("failed to load gesture classifier: {err:#}");
                self.classifier = ClassifierSlot::Failed;
                Some(ModelEvent::Failed(format!("{err:#}")))
            }
        }
    }

    /// Acquires the camera and arms the frame loop.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.running {
            return Ok(());
        }
        let stream = self.camera.open()?;
        self.stream = Some(stream);
        self.running = true;
        self.last_processed = None;
        self.latest_result = None;
        log::info!("gesture detection started");
        Ok(())
    }

    /// Cancels the frame loop and releases the camera. Returns false when
    /// there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        let was_active = self.running || self.stream.is_some();
        self.running = false;
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.latest_frame = None;
        self.latest_result = None;
        if was_active {
            log::info!("gesture detection stopped");
        }
        was_active
    }

    /// One loop iteration. Returns the top gesture label when the classifier
    /// recognized one in this frame.
    pub fn poll_frame(&mut self) -> Option<String> {
        if !self.running {
            return None;
        }
        let frame = self.stream.as_mut()?.latest_frame()?;

        let now = frame.timestamp;
        let due = self
            .last_processed
            .is_none_or(|last| now.saturating_duration_since(last) >= self.frame_interval);
        if !due {
            self.latest_frame = Some(frame);
            return None;
        }

        let ClassifierSlot::Ready(classifier) = &mut self.classifier else {
            self.latest_frame = Some(frame);
            return None;
        };

        let timestamp_ms = next_timestamp(&mut self.last_timestamp_ms, self.clock, now);
        self.last_processed = Some(now);
        let label = match classifier.recognize_for_video(&frame, timestamp_ms) {
            Ok(result) => {
                let label = top_gesture(&result).map(|c| c.category_name.clone());
                self.latest_result = Some(result);
                label
            }
            Err(err) => {
                log::warn!("gesture recognition failed: {err:#}");
                None
            }
        };
        self.latest_frame = Some(frame);
        label
    }
}

impl Drop for DetectionCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn next_timestamp(last: &mut Option<u64>, clock: Instant, now: Instant) -> u64 {
    let elapsed = now.saturating_duration_since(clock).as_millis() as u64;
    let ts = match *last {
        Some(prev) if elapsed <= prev => prev + 1,
        _ => elapsed,
    };
    *last = Some(ts);
    ts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, HandDetection, Handedness};
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct CameraLog {
        opened: AtomicUsize,
        stopped: AtomicUsize,
    }

    struct FakeCamera {
        log: Arc<CameraLog>,
        deny: bool,
    }

    struct FakeStream {
        log: Arc<CameraLog>,
        stopped: bool,
    }

    impl CameraSource for FakeCamera {
        fn open(&mut self) -> Result<Box<dyn MediaStream>, CameraError> {
            if self.deny {
                return Err(CameraError::PermissionDenied);
            }
            self.log.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                log: self.log.clone(),
                stopped: false,
            }))
        }
    }

    impl MediaStream for FakeStream {
        fn latest_frame(&mut self) -> Option<Frame> {
            (!self.stopped).then(|| Frame::blank(8, 8))
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.log.stopped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct ScriptedClassifier {
        labels: Vec<Option<&'static str>>,
        timestamps: Arc<Mutex<Vec<u64>>>,
    }

    impl GestureClassifier for ScriptedClassifier {
        fn recognize_for_video(
            &mut self,
            _frame: &Frame,
            timestamp_ms: u64,
        ) -> anyhow::Result<RecognitionResult> {
            self.timestamps.lock().unwrap().push(timestamp_ms);
            let next = if self.labels.is_empty() {
                None
            } else {
                self.labels.remove(0)
            };
            Ok(match next {
                Some(label) => RecognitionResult::with_hand(HandDetection {
                    gestures: vec![Category::new(label, 0.9)],
                    landmarks: vec![],
                    handedness: Handedness::Left,
                }),
                None => RecognitionResult::empty(),
            })
        }
    }

    fn coordinator(
        labels: Vec<Option<&'static str>>,
    ) -> (DetectionCoordinator, Arc<CameraLog>, Arc<Mutex<Vec<u64>>>) {
        let log = Arc::new(CameraLog::default());
        let timestamps = Arc::new(Mutex::new(Vec::new()));
        let classifier = ScriptedClassifier {
            labels,
            timestamps: timestamps.clone(),
        };
        let mut coordinator = DetectionCoordinator::new(
            Box::new(FakeCamera {
                log: log.clone(),
                deny: false,
            }),
            ModelLoad::finished(Ok(Box::new(classifier))),
            Duration::ZERO,
        );
        assert_eq!(coordinator.poll_model(), Some(ModelEvent::Ready));
        (coordinator, log, timestamps)
    }

    #[test]
    fn idle_coordinator_never_polls() {
        let (mut coordinator, log, timestamps) = coordinator(vec![Some("Victory")]);
        assert_eq!(coordinator.poll_frame(), None);
        assert_eq!(log.opened.load(Ordering::SeqCst), 0);
        assert!(timestamps.lock().unwrap().is_empty());
    }

    #[test]
    fn reports_gestures_and_keeps_polling() {
        let (mut coordinator, _, timestamps) =
            coordinator(vec![None, Some("Thumb_Up"), Some("Victory")]);
        coordinator.start().unwrap();

        assert_eq!(coordinator.poll_frame(), None);
        assert_eq!(coordinator.poll_frame().as_deref(), Some("Thumb_Up"));
        assert_eq!(coordinator.poll_frame().as_deref(), Some("Victory"));
        assert!(coordinator.latest_frame().is_some());

        let ts = timestamps.lock().unwrap();
        assert_eq!(ts.len(), 3);
        assert!(ts.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn stop_releases_camera_once() {
        let (mut coordinator, log, _) = coordinator(vec![]);
        coordinator.start().unwrap();
        assert!(coordinator.has_camera());

        assert!(coordinator.stop());
        assert!(!coordinator.has_camera());
        assert!(!coordinator.stop());
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.poll_frame(), None);
    }

    #[test]
    fn denied_camera_leaves_coordinator_stopped() {
        let mut coordinator = DetectionCoordinator::new(
            Box::new(FakeCamera {
                log: Arc::new(CameraLog::default()),
                deny: true,
            }),
            ModelLoad::finished(Err(anyhow::anyhow!("no model"))),
            Duration::ZERO,
        );
        assert!(matches!(
            coordinator.start(),
            Err(CameraError::PermissionDenied)
        ));
        assert!(!coordinator.is_running());
        assert!(!coordinator.has_camera());
    }

    #[test]
    fn frames_skipped_until_model_ready() {
        let log = Arc::new(CameraLog::default());
        let mut coordinator = DetectionCoordinator::new(
            Box::new(FakeCamera {
                log: log.clone(),
                deny: false,
            }),
            ModelLoad::finished(Err(anyhow::anyhow!("download failed"))),
            Duration::ZERO,
        );
        coordinator.start().unwrap();
        assert_eq!(coordinator.poll_frame(), None);
        assert!(coordinator.latest_frame().is_some());

        assert!(matches!(coordinator.poll_model(), Some(ModelEvent::Failed(_))));
        assert_eq!(coordinator.poll_model(), None);
        assert!(!coordinator.model_ready());
    }

    #[test]
    fn drop_releases_camera() {
        let (mut coordinator, log, _) = coordinator(vec![]);
        coordinator.start().unwrap();
        drop(coordinator);
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timestamps_strictly_increase() {
        let clock = Instant::now();
        let mut last = None;
        let a = next_timestamp(&mut last, clock, clock);
        let b = next_timestamp(&mut last, clock, clock);
        let c = next_timestamp(&mut last, clock, clock + Duration::from_millis(50));
        assert_eq!((a, b, c), (0, 1, 50));
    }
}
