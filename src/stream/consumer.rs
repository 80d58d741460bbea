use super::{
    client::{ChannelMessage, EventChannel},
    event::{GenerationEvent, parse_event},
};
use crate::session::SessionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Open,
    Finished,
}

/// One generation request and the channel feeding it.
pub struct GenerationRun {
    prompt: String,
    channel: Box<dyn EventChannel>,
    closed: bool,
}

impl GenerationRun {
    pub fn new(prompt: impl Into<String>, channel: Box<dyn EventChannel>) -> Self {
        Self {
            prompt: prompt.into(),
            channel,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Applies every message that has arrived since the last call, in order.
    /// Once the run is closed only a transport failure is still reported.
    pub fn pump(&mut self, state: &mut SessionState) -> RunStatus {
        while let Some(message) = self.channel.try_next() {
            if !self.closed {
                self.handle(message, state);
                continue;
            }
            if let ChannelMessage::Failed(err) = message {
                log::info!("generation stream dropped after close: {err}");
                state.transport_failed(true);
            }
        }
        if self.closed {
            RunStatus::Finished
        } else {
            RunStatus::Open
        }
    }

    fn handle(&mut self, message: ChannelMessage, state: &mut SessionState) {
        match message {
            ChannelMessage::Opened => {
                log::info!("generation stream open for \"{}\"", self.prompt);
                state.channel_opened();
            }
            ChannelMessage::Message(data) => {
                if data.is_empty() {
                    return;
                }
                match parse_event(&data) {
                    Ok(GenerationEvent::Unknown { tag }) => {
                        log::warn!("ignoring unknown generation event `{tag}`");
                    }
                    Ok(event) => {
                        log::debug!("generation event `{}`", event.tag());
                        state.apply_event(&event, &self.prompt);
                        if event.is_terminal() {
                            self.close();
                        }
                    }
                    Err(err) => {
                        log::error!("malformed generation event: {err}");
                        state.malformed_payload();
                    }
                }
            }
            ChannelMessage::Failed(err) => {
                log::error!("generation stream failed: {err}");
                state.transport_failed(false);
                self.close();
            }
        }
    }

    /// Releases the channel. Only the first call has an effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.channel.close();
        log::debug!("generation stream closed");
    }
}

impl Drop for GenerationRun {
    fn drop(&mut self) {
        self.close();
    }
}
