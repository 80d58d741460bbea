use std::io::{self, BufRead};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// Unnamed events (or ones explicitly named `message`) are what a browser
    /// hands to `onmessage`.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Incremental `text/event-stream` decoder.
pub struct SseDecoder<R> {
    reader: R,
    line: Vec<u8>,
    pending: SseEvent,
    has_data: bool,
}

impl<R: BufRead> SseDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            pending: SseEvent::default(),
            has_data: false,
        }
    }

    /// Reads until the next dispatched event. `Ok(None)` at end of stream; a
    /// partially received event at EOF is discarded.
    ///
    /// A read error leaves the decoder intact: bytes of an unfinished line
    /// are kept, so the call can be retried after a timeout.
    pub fn next_event(&mut self) -> io::Result<Option<SseEvent>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.line)?;
            if read == 0 {
                self.line.clear();
                return Ok(None);
            }
            if self.line.last() != Some(&b'\n') {
                // Unterminated line at EOF; the next read reports the end.
                continue;
            }

            let raw = std::mem::take(&mut self.line);
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    return Ok(Some(event));
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "data" => {
                    if self.has_data {
                        self.pending.data.push('\n');
                    }
                    self.pending.data.push_str(value);
                    self.has_data = true;
                }
                "event" => self.pending.event = Some(value.to_string()),
                "id" => self.pending.id = Some(value.to_string()),
                "retry" => {}
                other => log::debug!("ignoring unknown SSE field `{other}`"),
            }
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.pending);
        let has_data = std::mem::replace(&mut self.has_data, false);
        if !has_data {
            return None;
        }
        Some(event)
    }
}

impl<R: BufRead> Iterator for SseDecoder<R> {
    type Item = io::Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
