//! Request/response pairing for a single exchange.
//!
//! A [`Connection`] owns the request and the response under construction for
//! exactly one exchange. The response leaves through a [`ResponseWriter`]
//! supplied by the transport, at most once:
//!
//! ```text
//! Idle ──send()──► Sending ──► Sent
//!   any later send() ─► Err(SendError::AlreadySent), nothing written
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use tracing::{debug, trace};

use super::header::Header;
use super::request::Request;
use super::response::{Content, Response};
use crate::codec::CodecRegistry;
use crate::codes::CONTENT_TYPE_DEFAULT;
use crate::error::{CodecError, CodecResult, SendError, SendResult};

// =============================================================================
// Writer
// =============================================================================

/// A fully encoded response handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub status: u16,
    pub message: Option<String>,
    pub headers: Header,
    pub body: Vec<u8>,
}

impl Outgoing {
    /// Parses the body as JSON, mostly useful in tests.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// The transport side of a connection.
#[async_trait]
pub trait ResponseWriter: Send + Sync {
    /// Writes one encoded response.
    async fn write(&self, outgoing: Outgoing) -> SendResult<()>;
}

/// A writer that keeps every response it receives.
#[derive(Debug, Default)]
pub struct BufferedWriter {
    written: Mutex<Vec<Outgoing>>,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of responses written so far.
    pub fn writes(&self) -> usize {
        self.written.lock().len()
    }

    /// The most recent response.
    pub fn last(&self) -> Option<Outgoing> {
        self.written.lock().last().cloned()
    }

    /// Removes and returns the most recent response.
    pub fn take(&self) -> Option<Outgoing> {
        self.written.lock().pop()
    }
}

#[async_trait]
impl ResponseWriter for BufferedWriter {
    async fn write(&self, outgoing: Outgoing) -> SendResult<()> {
        self.written.lock().push(outgoing);
        Ok(())
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Flush latch states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SendState {
    Idle = 0,
    Sending = 1,
    Sent = 2,
}

impl SendState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Sending,
            _ => Self::Sent,
        }
    }
}

/// One request and its response.
///
/// Connections are created per request and never shared across requests.
/// Accessors hand out short-lived lock guards; none of them may be held
/// across an `.await`.
pub struct Connection {
    request: RwLock<Request>,
    response: Mutex<Response>,
    state: AtomicU8,
    writer: Arc<dyn ResponseWriter>,
    codecs: Arc<CodecRegistry>,
}

impl Connection {
    /// Pairs `request` with a default response that flushes into `writer`.
    pub fn new(request: Request, writer: Arc<dyn ResponseWriter>) -> Self {
        Self {
            request: RwLock::new(request),
            response: Mutex::new(Response::new()),
            state: AtomicU8::new(SendState::Idle as u8),
            writer,
            codecs: Arc::new(CodecRegistry::with_defaults()),
        }
    }

    /// Replaces the codec registry (builder pattern).
    pub fn with_codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Replaces the initial response (builder pattern).
    pub fn with_response(self, response: Response) -> Self {
        *self.response.lock() = response;
        self
    }

    pub fn request(&self) -> RwLockReadGuard<'_, Request> {
        self.request.read()
    }

    pub fn request_mut(&self) -> RwLockWriteGuard<'_, Request> {
        self.request.write()
    }

    pub fn response(&self) -> MutexGuard<'_, Response> {
        self.response.lock()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn send_state(&self) -> SendState {
        SendState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` once a send has started.
    pub fn is_sent(&self) -> bool {
        self.send_state() != SendState::Idle
    }

    /// Decodes the request body with the codec for its content type.
    ///
    /// Returns `Ok(None)` for an empty body. Requests without a
    /// `Content-Type` header are decoded as JSON.
    pub fn read_input(&self) -> CodecResult<Option<Value>> {
        let request = self.request.read();
        if request.body().is_empty() {
            return Ok(None);
        }
        let content_type = request.content_type().unwrap_or(CONTENT_TYPE_DEFAULT);
        self.codecs.decode(content_type, request.body()).map(Some)
    }

    /// Encodes and writes the response.
    ///
    /// Only the first call writes; every later call fails with
    /// [`SendError::AlreadySent`]. The latch stays closed even when the
    /// first write fails.
    pub async fn send(&self) -> SendResult<()> {
        if self
            .state
            .compare_exchange(
                SendState::Idle as u8,
                SendState::Sending as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            trace!("Send skipped, response already sent");
            return Err(SendError::AlreadySent);
        }

        let result = match self.encode() {
            Ok(outgoing) => {
                debug!(status = outgoing.status, bytes = outgoing.body.len(), "Sending response");
                self.writer.write(outgoing).await
            }
            Err(e) => Err(e.into()),
        };
        self.state.store(SendState::Sent as u8, Ordering::Release);
        result
    }

    fn encode(&self) -> Result<Outgoing, CodecError> {
        let response = self.response.lock();
        let body = match response.content() {
            None => Vec::new(),
            Some(Content::Bytes(bytes)) => bytes.clone(),
            Some(Content::Value(Value::String(text))) => text.as_bytes().to_vec(),
            Some(Content::Value(value)) => self.codecs.encode(response.content_type(), value)?,
        };

        let mut headers = response.headers().clone();
        if !headers.has("Content-Type") {
            headers.set("Content-Type", response.content_type_header());
        }

        Ok(Outgoing {
            status: response.status(),
            message: response.message().map(str::to_string),
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("request", &*self.request.read())
            .field("state", &self.send_state())
            .finish()
    }
}
