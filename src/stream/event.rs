use serde::Deserialize;

use crate::error::PayloadError;

/// Tagged event decoded from one server-push message.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationEvent {
    Status { message: String },
    Progress { message: String, percent: f64 },
    Complete { image: String },
    Error { message: String },
    Unknown { tag: String },
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Complete { .. } | GenerationEvent::Error { .. }
        )
    }

    pub fn tag(&self) -> &str {
        match self {
            GenerationEvent::Status { .. } => "status",
            GenerationEvent::Progress { .. } => "progress",
            GenerationEvent::Complete { .. } => "complete",
            GenerationEvent::Error { .. } => "error",
            GenerationEvent::Unknown { tag } => tag,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    image: Option<String>,
}

/// Decodes the JSON envelope `{"event": <tag>, ...}` carried in an event's data.
pub fn parse_event(payload: &str) -> Result<GenerationEvent, PayloadError> {
    let envelope: Envelope = serde_json::from_str(payload)?;
    let tag = envelope.event.unwrap_or_default();

    let event = match tag.as_str() {
        "status" => GenerationEvent::Status {
            message: envelope.data.ok_or(PayloadError::MissingField {
                tag: "status",
                field: "data",
            })?,
        },
        "progress" => {
            let percent = envelope.progress.ok_or(PayloadError::MissingField {
                tag: "progress",
                field: "progress",
            })?;
            if !percent.is_finite() {
                return Err(PayloadError::InvalidProgress(percent));
            }
            GenerationEvent::Progress {
                message: envelope.data.unwrap_or_default(),
                percent,
            }
        }
        "complete" => GenerationEvent::Complete {
            image: envelope.image.ok_or(PayloadError::MissingField {
                tag: "complete",
                field: "image",
            })?,
        },
        "error" => GenerationEvent::Error {
            message: envelope.data.unwrap_or_else(|| "unknown error".to_string()),
        },
        _ => GenerationEvent::Unknown { tag },
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_progress_envelope() {
        let event = parse_event(r#"{"event":"progress","data":"Rendering","progress":42}"#)
            .unwrap();
        assert_eq!(
            event,
            GenerationEvent::Progress {
                message: "Rendering".into(),
                percent: 42.0
            }
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn decodes_terminal_events() {
        let complete = parse_event(r#"{"event":"complete","image":"/images/a.png"}"#).unwrap();
        assert_eq!(
            complete,
            GenerationEvent::Complete {
                image: "/images/a.png".into()
            }
        );
        assert!(complete.is_terminal());

        let error = parse_event(r#"{"event":"error","data":"CUDA out of memory"}"#).unwrap();
        assert_eq!(error.tag(), "error");
        assert!(error.is_terminal());
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let event = parse_event(r#"{"event":"image_url","data":"/images/x.png"}"#).unwrap();
        assert_eq!(
            event,
            GenerationEvent::Unknown {
                tag: "image_url".into()
            }
        );
    }

    #[test]
    fn envelope_without_tag_is_unknown() {
        let event = parse_event(r#"{"data":"hello"}"#).unwrap();
        assert_eq!(event, GenerationEvent::Unknown { tag: String::new() });
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            parse_event("Loading Stable Diffusion model..."),
            Err(PayloadError::Json(_))
        ));
        assert!(matches!(
            parse_event(r#"{"event":"complete"}"#),
            Err(PayloadError::MissingField {
                tag: "complete",
                field: "image"
            })
        ));
        assert!(matches!(
            parse_event(r#"{"event":"progress","data":"x"}"#),
            Err(PayloadError::MissingField { .. })
        ));
    }
}
