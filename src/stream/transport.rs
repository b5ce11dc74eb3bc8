//! Transport boundary for the duplex stream.
//!
//! [`DuplexTransport`] is the seam between the session bridge and whatever
//! carries messages to the remote service.  It is object-safe and
//! `Send + Sync` so one transport can be written by the producer thread and
//! read by the reader thread at the same time.
//!
//! [`Connector`] opens one transport per call.

use std::time::Duration;

use thiserror::Error;

use super::protocol::{StreamStatus, StreamingRequest, StreamingResponse};

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Failures while establishing a stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connector could not reach the remote service.
    #[error("failed to connect stream for call {call_id}: {reason}")]
    Connect { call_id: String, reason: String },

    /// The stream closed before the configuration message was accepted.
    #[error("stream for call {0} closed before configuration was sent")]
    Closed(String),
}

// ---------------------------------------------------------------------------
// DuplexTransport
// ---------------------------------------------------------------------------

/// A bidirectional message stream to the remote service.
///
/// # Contract
///
/// - `send` never blocks for longer than it takes to enqueue the message and
///   returns `false` once the stream is broken or finished.
/// - `recv` is called by exactly one thread.  It blocks until a message
///   arrives and returns `None` once no more messages will ever arrive.
/// - `writes_done` half-closes the outbound direction; inbound messages keep
///   flowing.
/// - `finish` blocks until the remote side reports its terminal status, or
///   `timeout` expires.  On expiry the transport cancels itself so a pending
///   `recv` returns `None` promptly.
pub trait DuplexTransport: Send + Sync {
    fn send(&self, request: &StreamingRequest) -> bool;

    fn writes_done(&self);

    fn recv(&self) -> Option<StreamingResponse>;

    fn finish(&self, timeout: Duration) -> StreamStatus;
}

// Compile-time assertion: Box<dyn DuplexTransport> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn DuplexTransport>) {}
};

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Opens a fresh [`DuplexTransport`] for a call.
pub trait Connector: Send + Sync {
    fn connect(&self, call_id: &str) -> Result<Box<dyn DuplexTransport>, TransportError>;
}
