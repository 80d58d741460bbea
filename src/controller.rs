use crate::{
    coordinator::{DetectionCoordinator, ModelEvent},
    error::SessionError,
    session::{GestureOutcome, SessionState},
    stream::{GenerationBackend, GenerationRun, RunStatus},
    types::{Frame, RecognitionResult},
};

/// Drives the session from the UI thread: user commands in, [`Controller::tick`]
/// once per frame.
pub struct Controller {
    state: SessionState,
    coordinator: DetectionCoordinator,
    backend: Box<dyn GenerationBackend>,
    run: Option<GenerationRun>,
}

impl Controller {
    pub fn new(coordinator: DetectionCoordinator, backend: Box<dyn GenerationBackend>) -> Self {
        let mut state = SessionState::new();
        state.model_loading();
        Self {
            state,
            coordinator,
            backend,
            run: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn preview(&self) -> Option<(&Frame, Option<&RecognitionResult>)> {
        let frame = self.coordinator.latest_frame()?;
        Some((frame, self.coordinator.latest_result()))
    }

    pub fn has_open_run(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.is_closed())
    }

    pub fn camera_active(&self) -> bool {
        self.coordinator.has_camera()
    }

    /// Idle -> Detecting. A camera failure lands back in Idle with the
    /// reason shown; that is not reported as an error.
    pub fn start_detection(&mut self) -> Result<(), SessionError> {
        self.state.begin_detection()?;
        match self.coordinator.start() {
            Ok(()) => {
                if self.coordinator.model_ready() {
                    self.state.camera_started();
                }
            }
            Err(err) => {
                log::error!("failed to start camera: {err}");
                self.coordinator.stop();
                self.state.camera_denied();
            }
        }
        Ok(())
    }

    /// Returns false when detection was not running.
    pub fn stop_detection(&mut self) -> bool {
        if !self.state.is_detecting() {
            return false;
        }
        self.coordinator.stop();
        self.state.end_detection();
        true
    }

    pub fn handle_gesture(&mut self, label: &str) -> GestureOutcome {
        let outcome = self.state.gesture_recognized(label);
        match &outcome {
            GestureOutcome::Prompt(prompt) => {
                log::info!("gesture {label} -> \"{prompt}\"");
                if let Err(err) = self.generate(prompt) {
                    log::warn!("generation for {label} rejected: {err}");
                }
            }
            GestureOutcome::NoPrompt => log::warn!("no prompt defined for {label}"),
            GestureOutcome::Ignored => {}
        }
        outcome
    }

    /// Detecting -> Generating. Detection stops before the request goes out.
    pub fn generate(&mut self, prompt: &str) -> Result<(), SessionError> {
        if self.has_open_run() {
            return Err(SessionError::RunInProgress);
        }
        self.state.begin_generation(prompt)?;
        self.coordinator.stop();

        match self.backend.open(prompt) {
            Ok(channel) => {
                self.run = Some(GenerationRun::new(prompt, channel));
            }
            Err(err) => {
                log::error!("failed to open generation stream: {err}");
                self.state.generation_start_failed(&err.to_string());
            }
        }
        Ok(())
    }

    /// One cooperative step: model load, one frame, pending stream messages.
    pub fn tick(&mut self) {
        match self.coordinator.poll_model() {
            Some(ModelEvent::Ready) => self.state.model_ready(),
            Some(ModelEvent::Failed(reason)) => {
                log::error!("gesture detection unavailable: {reason}");
                self.stop_detection();
                self.state.model_failed();
            }
            None => {}
        }

        if let Some(label) = self.coordinator.poll_frame() {
            self.handle_gesture(&label);
        }

        if let Some(run) = self.run.as_mut() {
            if run.pump(&mut self.state) == RunStatus::Finished {
                self.run = None;
            }
        }

        if !self.state.is_detecting() && self.coordinator.is_running() {
            self.coordinator.stop();
        }
    }

    /// Window teardown: closes the stream and releases the camera.
    pub fn shutdown(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.close();
        }
        self.stop_detection();
        self.coordinator.stop();
        log::info!("session shut down");
    }
}

