//! Streaming image generation over server-sent events.

pub mod client;
pub mod consumer;
pub mod event;
pub mod sse;

pub use self::{
    client::{ChannelMessage, DEFAULT_ENDPOINT, EventChannel, GenerationBackend, SseBackend},
    consumer::{GenerationRun, RunStatus},
    event::{GenerationEvent, parse_event},
};
