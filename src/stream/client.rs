use std::{
    io::{self, BufReader},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use reqwest::{
    Url,
    blocking::Client,
    header::{ACCEPT, CONTENT_TYPE},
};

use super::sse::SseDecoder;
use crate::error::StreamError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/generate-stream";

/// How long one blocking read on the stream may wait before the reader
/// re-checks its stop flag. Also bounds the wait for response headers.
pub const READ_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What a server-push channel delivers, in arrival order.
#[derive(Debug)]
pub enum ChannelMessage {
    Opened,
    /// Data of one message event.
    Message(String),
    /// Transport-level failure; nothing follows it.
    Failed(StreamError),
}

/// One open server-push connection.
pub trait EventChannel: Send {
    /// Next pending message without blocking.
    fn try_next(&mut self) -> Option<ChannelMessage>;

    fn close(&mut self);
}

/// Opens one channel per generation request.
pub trait GenerationBackend {
    fn open(&self, prompt: &str) -> Result<Box<dyn EventChannel>, StreamError>;
}

/// Server-sent events over HTTP, read on a helper thread.
#[derive(Debug, Clone)]
pub struct SseBackend {
    http: Client,
    endpoint: String,
}

impl SseBackend {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StreamError> {
        Self::with_read_poll(endpoint, READ_POLL_INTERVAL)
    }

    /// A silent stream is never an error; `poll` only sets how often the
    /// reader wakes up to notice that its channel was closed.
    pub fn with_read_poll(endpoint: impl Into<String>, poll: Duration) -> Result<Self, StreamError> {
        // Blocking reqwest applies this per read, not to the whole body.
        let http = Client::builder()
            .timeout(poll)
            .build()
            .map_err(|source| StreamError::Network {
                context: "failed to build HTTP client".into(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint with the prompt appended verbatim as the `prompt` query parameter.
    pub fn stream_url(&self, prompt: &str) -> Result<Url, StreamError> {
        Url::parse_with_params(&self.endpoint, &[("prompt", prompt)]).map_err(|err| {
            StreamError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: err.to_string(),
            }
        })
    }
}

impl GenerationBackend for SseBackend {
    fn open(&self, prompt: &str) -> Result<Box<dyn EventChannel>, StreamError> {
        let url = self.stream_url(prompt)?;
        log::info!("opening generation stream {url}");

        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let http = self.http.clone();
        thread::Builder::new()
            .name("generation-stream".into())
            .spawn(move || read_stream(http, url, tx, stop_flag))?;

        Ok(Box::new(SseChannel { rx, stop }))
    }
}

fn read_stream(http: Client, url: Url, tx: Sender<ChannelMessage>, stop: Arc<AtomicBool>) {
    let fail = |err: StreamError| {
        let _ = tx.send(ChannelMessage::Failed(err));
    };

    let response = match http.get(url).header(ACCEPT, "text/event-stream").send() {
        Ok(response) => response,
        Err(source) => {
            return fail(StreamError::Network {
                context: "failed to connect to generation server".into(),
                source,
            });
        }
    };
    if !response.status().is_success() {
        return fail(StreamError::Http {
            status: response.status().as_u16(),
        });
    }
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("text/event-stream") {
        return fail(StreamError::UnexpectedContentType(content_type));
    }

    if tx.send(ChannelMessage::Opened).is_err() {
        return;
    }

    let mut decoder = SseDecoder::new(BufReader::new(response));
    while !stop.load(Ordering::Relaxed) {
        match decoder.next_event() {
            Ok(Some(event)) => {
                if !event.is_message() {
                    log::debug!(
                        "skipping named event `{}`",
                        event.event.as_deref().unwrap_or_default()
                    );
                    continue;
                }
                if event.data.is_empty() {
                    continue;
                }
                if tx.send(ChannelMessage::Message(event.data)).is_err() {
                    return;
                }
            }
            Ok(None) => return fail(StreamError::EndOfStream),
            Err(err) if is_read_timeout(&err) => continue,
            Err(err) => return fail(StreamError::Io(err)),
        }
    }
    log::debug!("generation stream reader stopped");
}

fn is_read_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        || err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout)
}

struct SseChannel {
    rx: Receiver<ChannelMessage>,
    stop: Arc<AtomicBool>,
}

impl EventChannel for SseChannel {
    /// Messages queued before `close` can still be drained.
    fn try_next(&mut self) -> Option<ChannelMessage> {
        self.rx.try_recv().ok()
    }

    fn close(&mut self) {
        // The reader notices within one read poll and drops the connection;
        // it is not joined here.
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for SseChannel {
    fn drop(&mut self) {
        self.close();
    }
}
