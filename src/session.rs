use crate::{error::SessionError, prompts, stream::event::GenerationEvent};

/// Mutually exclusive mode of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Idle,
    Detecting,
    Generating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultBanner {
    pub kind: ResultKind,
    pub text: String,
}

impl ResultBanner {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Info,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Error,
            text: text.into(),
        }
    }
}

/// What a recognized gesture resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Lifecycle was not `Detecting`; nothing changed.
    Ignored,
    NoPrompt,
    Prompt(&'static str),
}

/// Everything the window shows. Mutated only through the transitions below.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    lifecycle: Lifecycle,
    model: ModelStatus,
    status: String,
    detector_status: String,
    progress: f64,
    result: Option<ResultBanner>,
    image: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            model: ModelStatus::Loading,
            status: String::new(),
            detector_status: "Initializing...".to_string(),
            progress: 0.0,
            result: None,
            image: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn detector_status(&self) -> &str {
        &self.detector_status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn result(&self) -> Option<&ResultBanner> {
        self.result.as_ref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn is_detecting(&self) -> bool {
        self.lifecycle == Lifecycle::Detecting
    }

    pub fn is_generating(&self) -> bool {
        self.lifecycle == Lifecycle::Generating
    }

    pub fn can_start_detection(&self) -> bool {
        self.lifecycle == Lifecycle::Idle && self.model != ModelStatus::Failed
    }

    // ── Model ──────────────────────────────────────────────────────

    pub fn model_loading(&mut self) {
        self.model = ModelStatus::Loading;
        self.detector_status = "Loading model...".to_string();
    }

    pub fn model_ready(&mut self) {
        self.model = ModelStatus::Ready;
        if self.lifecycle == Lifecycle::Detecting {
            self.detector_status = "Detection active - Show your gesture".to_string();
        } else {
            self.detector_status = "Model loaded - Click Start Detection".to_string();
        }
    }

    pub fn model_failed(&mut self) {
        self.model = ModelStatus::Failed;
        self.detector_status = "Failed to load model".to_string();
    }

    // ── Detection ──────────────────────────────────────────────────

    pub fn begin_detection(&mut self) -> Result<(), SessionError> {
        match self.lifecycle {
            Lifecycle::Generating => return Err(SessionError::Generating),
            Lifecycle::Detecting => return Err(SessionError::AlreadyDetecting),
            Lifecycle::Idle => {}
        }
        if self.model == ModelStatus::Failed {
            return Err(SessionError::ModelUnavailable);
        }

        self.lifecycle = Lifecycle::Detecting;
        self.result = None;
        self.status = "Gesture detection started...".to_string();
        self.progress = 0.0;
        Ok(())
    }

    pub fn camera_started(&mut self) {
        if self.lifecycle == Lifecycle::Detecting {
            self.detector_status = "Detection active - Show your gesture".to_string();
        }
    }

    pub fn camera_denied(&mut self) {
        if self.lifecycle != Lifecycle::Detecting {
            return;
        }
        self.lifecycle = Lifecycle::Idle;
        self.detector_status = "Camera access denied".to_string();
        self.status = "Camera access denied".to_string();
    }

    pub fn end_detection(&mut self) {
        if self.lifecycle == Lifecycle::Detecting {
            self.lifecycle = Lifecycle::Idle;
            self.status = "Gesture detection stopped".to_string();
        }
    }

    /// Handles one "gesture detected" signal. Only honoured while `Detecting`.
    pub fn gesture_recognized(&mut self, label: &str) -> GestureOutcome {
        if self.lifecycle != Lifecycle::Detecting {
            return GestureOutcome::Ignored;
        }

        self.detector_status = format!("Detected: {label}");
        let Some(prompt) = prompts::prompt_for(label) else {
            // The last image and progress stay up; detection just carries on.
            self.result = Some(ResultBanner::error(format!(
                "No prompt defined for {label}"
            )));
            self.status = "Detection active - Show your gesture".to_string();
            return GestureOutcome::NoPrompt;
        };

        self.result = Some(ResultBanner::info(format!("Detected: {label}")));
        self.image = None;
        self.status = "Preparing prompt...".to_string();
        self.progress = 0.0;
        GestureOutcome::Prompt(prompt)
    }

    // ── Generation ─────────────────────────────────────────────────

    /// `Detecting -> Generating`; the only way into `Generating`.
    pub fn begin_generation(&mut self, prompt: &str) -> Result<(), SessionError> {
        match self.lifecycle {
            Lifecycle::Generating => return Err(SessionError::RunInProgress),
            Lifecycle::Idle => return Err(SessionError::NotDetecting),
            Lifecycle::Detecting => {}
        }
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        self.lifecycle = Lifecycle::Generating;
        self.image = None;
        self.progress = 0.0;
        self.status = "Initializing connection...".to_string();
        Ok(())
    }

    pub fn generation_start_failed(&mut self, reason: &str) {
        self.result = Some(ResultBanner::error(format!(
            "Initialization failed: {reason}"
        )));
        self.status = "Failed to start generation".to_string();
        self.progress = 0.0;
        self.lifecycle = Lifecycle::Idle;
    }

    pub fn channel_opened(&mut self) {
        if self.lifecycle == Lifecycle::Generating {
            self.status = "Connected to server, starting generation...".to_string();
        }
    }

    /// Applies one decoded event. Terminal events leave the session `Idle`.
    pub fn apply_event(&mut self, event: &GenerationEvent, prompt: &str) {
        match event {
            GenerationEvent::Status { message } => {
                self.status = message.clone();
            }
            GenerationEvent::Progress { message, percent } => {
                let percent = percent.clamp(0.0, 100.0);
                self.status = format!("{message} ({}%)", percent.round() as i64);
                self.progress = self.progress.max(percent);
            }
            GenerationEvent::Complete { image } => {
                self.image = Some(image.clone());
                self.result = Some(ResultBanner::success(format!(
                    "Successfully generated: {prompt}"
                )));
                self.status = "Generation complete!".to_string();
                self.progress = 100.0;
                self.lifecycle = Lifecycle::Idle;
            }
            GenerationEvent::Error { message } => {
                self.result = Some(ResultBanner::error(format!(
                    "Generation error: {message}"
                )));
                self.status = "Failed to generate image".to_string();
                self.progress = 0.0;
                self.lifecycle = Lifecycle::Idle;
            }
            GenerationEvent::Unknown { .. } => {}
        }
    }

    pub fn malformed_payload(&mut self) {
        self.status = "Error processing server response".to_string();
    }

    /// Transport failure. After a normal close only the status changes.
    pub fn transport_failed(&mut self, channel_closed: bool) {
        if channel_closed {
            self.status = "Connection closed".to_string();
            return;
        }
        self.result = Some(ResultBanner::error("Connection to server failed"));
        self.status = "Network error - try again".to_string();
        self.progress = 0.0;
        if self.lifecycle == Lifecycle::Generating {
            self.lifecycle = Lifecycle::Idle;
        }
    }
}
