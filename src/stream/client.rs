//! The per-call duplex stream client.
//!
//! [`DuplexStreamClient`] owns one [`DuplexTransport`] and enforces the
//! stream protocol on top of it:
//!
//! ```text
//! open ──▶ Open ──half_close──▶ HalfClosed ──finish──▶ Finished
//!            └──────────────finish──────────────────────▲
//! ```
//!
//! - The configuration message is always the first message sent.
//! - `write` is only honoured while `Open`.
//! - `finish` contacts the transport once; every later call returns the
//!   stored terminal status.
//!
//! The client is shared (`Arc`) between the producer, which writes, and the
//! reader thread, which reads.  All methods take `&self`.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use super::protocol::{StreamStatus, StreamingConfig, StreamingRequest, StreamingResponse};
use super::transport::{DuplexTransport, TransportError};

// ---------------------------------------------------------------------------
// StreamState
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`DuplexStreamClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Audio may be written.
    Open,
    /// No more audio will be sent; results may still arrive.
    HalfClosed,
    /// Terminal status has been requested; nothing else happens.
    Finished,
}

impl StreamState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::HalfClosed,
            _ => Self::Finished,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::HalfClosed => 1,
            Self::Finished => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamSetup
// ---------------------------------------------------------------------------

/// Everything needed to open a stream for one call.
#[derive(Debug, Clone)]
pub struct StreamSetup {
    pub call_id: String,
    /// Remote session path, e.g. `projects/p/agent/sessions/<call id>`.
    pub session_path: Option<String>,
    pub config: StreamingConfig,
    /// Upper bound on how long [`DuplexStreamClient::finish`] waits.
    pub finish_timeout: Duration,
}

/// Session path used by the intent-detection service.
pub fn intent_session_path(project_id: &str, call_id: &str) -> String {
    format!("projects/{project_id}/agent/sessions/{call_id}")
}

// ---------------------------------------------------------------------------
// DuplexStreamClient
// ---------------------------------------------------------------------------

pub struct DuplexStreamClient {
    call_id: String,
    session_path: Option<String>,
    transport: Box<dyn DuplexTransport>,
    state: AtomicU8,
    /// Reused for every audio chunk so steady-state writes do not allocate.
    request: Mutex<StreamingRequest>,
    terminal: OnceLock<StreamStatus>,
    finish_timeout: Duration,
    packets: AtomicU64,
}

impl std::fmt::Debug for DuplexStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexStreamClient")
            .field("call_id", &self.call_id)
            .field("session_path", &self.session_path)
            .field("state", &self.state())
            .field("packets", &self.packets_written())
            .finish_non_exhaustive()
    }
}

impl DuplexStreamClient {
    /// Take ownership of `transport` and send the configuration message.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] when the transport rejects the
    /// configuration message.
    pub fn open(
        setup: StreamSetup,
        transport: Box<dyn DuplexTransport>,
    ) -> Result<Self, TransportError> {
        let StreamSetup {
            call_id,
            session_path,
            config,
            finish_timeout,
        } = setup;

        let request = StreamingRequest {
            session: session_path.clone(),
            config: Some(config),
            input_audio: Vec::new(),
        };

        log::debug!(
            "stream[{call_id}]: opening (session {:?}, event {:?})",
            session_path,
            request.config.as_ref().and_then(|c| c.event.as_ref()).map(|e| &e.name)
        );

        if !transport.send(&request) {
            return Err(TransportError::Closed(call_id));
        }

        Ok(Self {
            call_id,
            session_path,
            transport,
            state: AtomicU8::new(StreamState::Open.as_u8()),
            request: Mutex::new(request),
            terminal: OnceLock::new(),
            finish_timeout,
            packets: AtomicU64::new(0),
        })
    }

    /// Send one chunk of encoded audio.
    ///
    /// Returns `false` when the client is no longer `Open` or the transport
    /// rejected the message.  After a `false` the caller must stop producing.
    pub fn write(&self, audio: &[u8]) -> bool {
        let state = self.state();
        if state != StreamState::Open {
            log::debug!("stream[{}]: not writing, stream is {state:?}", self.call_id);
            return false;
        }

        let mut request = self.request.lock().unwrap_or_else(PoisonError::into_inner);
        request.config = None;
        request.input_audio.clear();
        request.input_audio.extend_from_slice(audio);

        let sent = self.transport.send(&request);
        if sent {
            self.packets.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    /// Signal that no more audio will be sent.  Idempotent; a no-op unless
    /// the stream is `Open`.
    pub fn half_close(&self) {
        let swapped = self.state.compare_exchange(
            StreamState::Open.as_u8(),
            StreamState::HalfClosed.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if swapped.is_ok() {
            log::debug!("stream[{}]: half-closed", self.call_id);
            self.transport.writes_done();
        }
    }

    /// Obtain the terminal status, blocking until the remote side reports it
    /// or the finish timeout expires.
    ///
    /// Only the first call reaches the transport.  Concurrent callers wait
    /// for that call; later callers get the stored status.
    pub fn finish(&self) -> StreamStatus {
        self.state
            .store(StreamState::Finished.as_u8(), Ordering::Release);

        self.terminal
            .get_or_init(|| {
                log::debug!(
                    "stream[{}]: finishing after {} packets",
                    self.call_id,
                    self.packets_written()
                );
                let status = self.transport.finish(self.finish_timeout);
                if status.is_ok() {
                    log::debug!("stream[{}]: finished", self.call_id);
                } else {
                    log::warn!("stream[{}]: finished with {status}", self.call_id);
                }
                status
            })
            .clone()
    }

    /// Block for the next result.  Returns `None` once the stream has no
    /// more results.
    ///
    /// Only the session's reader thread may call this.
    pub fn read(&self) -> Option<StreamingResponse> {
        self.transport.recv()
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn session_path(&self) -> Option<&str> {
        self.session_path.as_deref()
    }

    /// Number of audio chunks handed to the transport.
    pub fn packets_written(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    /// The stored terminal status, if [`finish`](Self::finish) has completed.
    pub fn terminal_status(&self) -> Option<&StreamStatus> {
        self.terminal.get()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
