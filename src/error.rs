use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera access denied")]
    PermissionDenied,

    #[error("no camera available")]
    NoDevice,

    #[error("camera backend failure: {0}")]
    Backend(String),
}

/// Failures opening or reading the generation event stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid generation endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    #[error("generation server returned HTTP {status}")]
    Http { status: u16 },

    #[error("expected text/event-stream, got {0}")]
    UnexpectedContentType(String),

    #[error("stream ended before a terminal event")]
    EndOfStream,

    #[error("failed to read event stream: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded event payload that cannot be applied.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid JSON envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{tag}` event is missing `{field}`")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },

    #[error("progress value {0} is not a finite number")]
    InvalidProgress(f64),
}

/// Requests rejected by the lifecycle gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("generation already running")]
    Generating,

    #[error("detection already running")]
    AlreadyDetecting,

    #[error("detection is not active")]
    NotDetecting,

    #[error("a generation run is still open")]
    RunInProgress,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("gesture model is unavailable")]
    ModelUnavailable,
}
