//! In-process duplex transport.
//!
//! [`duplex`] returns a connected pair: a [`LoopbackTransport`] for the
//! bridge and a [`RemotePeer`] that plays the remote service.  The peer sees
//! every outbound message, can push responses at any time, and ends the
//! stream with [`RemotePeer::close`].
//!
//! [`LoopbackConnector`] hands out one pair per call and forwards each peer
//! to whoever holds the receiving end of its channel (a simulated service
//! thread, or a test).
//!
//! All channels are `std::sync::mpsc`; outbound sends never block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::protocol::{StatusCode, StreamStatus, StreamingRequest, StreamingResponse};
use super::transport::{Connector, DuplexTransport, TransportError};

/// How often a blocked `recv` re-checks for cancellation by default.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// Create a connected transport / remote-peer pair.
pub fn duplex(poll: Duration) -> (LoopbackTransport, RemotePeer) {
    let (request_tx, request_rx) = mpsc::channel();
    let (response_tx, response_rx) = mpsc::channel();
    let (status_tx, status_rx) = mpsc::channel();

    let transport = LoopbackTransport {
        outbound: Mutex::new(Some(request_tx)),
        inbound: Mutex::new(response_rx),
        status: Mutex::new(status_rx),
        cancelled: AtomicBool::new(false),
        poll,
    };
    let peer = RemotePeer {
        requests: request_rx,
        responses: Some(response_tx),
        status: Some(status_tx),
    };
    (transport, peer)
}

// ---------------------------------------------------------------------------
// LoopbackTransport
// ---------------------------------------------------------------------------

/// Bridge-side end of a loopback stream.
pub struct LoopbackTransport {
    /// Dropped on half-close so the peer observes end of input.
    outbound: Mutex<Option<Sender<StreamingRequest>>>,
    inbound: Mutex<Receiver<StreamingResponse>>,
    status: Mutex<Receiver<StreamStatus>>,
    cancelled: AtomicBool,
    poll: Duration,
}

impl LoopbackTransport {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl DuplexTransport for LoopbackTransport {
    fn send(&self, request: &StreamingRequest) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return false;
        }
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.as_ref() {
            Some(tx) => tx.send(request.clone()).is_ok(),
            None => false,
        }
    }

    fn writes_done(&self) {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn recv(&self) -> Option<StreamingResponse> {
        let inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return None;
            }
            match inbound.recv_timeout(self.poll) {
                Ok(response) => return Some(response),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn finish(&self, timeout: Duration) -> StreamStatus {
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match status.recv_timeout(timeout) {
            Ok(status) => status,
            Err(RecvTimeoutError::Timeout) => {
                self.cancel();
                StreamStatus::new(
                    StatusCode::DeadlineExceeded,
                    format!("no terminal status within {} ms", timeout.as_millis()),
                )
            }
            Err(RecvTimeoutError::Disconnected) => {
                StreamStatus::new(StatusCode::Unavailable, "remote peer went away")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RemotePeer
// ---------------------------------------------------------------------------

/// Service-side end of a loopback stream.
///
/// Dropping a peer without calling [`close`](Self::close) ends the stream
/// with an `Unavailable` status.
pub struct RemotePeer {
    requests: Receiver<StreamingRequest>,
    responses: Option<Sender<StreamingResponse>>,
    status: Option<Sender<StreamStatus>>,
}

impl RemotePeer {
    /// Wait up to `timeout` for the next outbound message.
    ///
    /// Returns `None` on timeout or once the bridge has half-closed.
    pub fn next_request(&self, timeout: Duration) -> Option<StreamingRequest> {
        self.requests.recv_timeout(timeout).ok()
    }

    /// Collect outbound messages until the bridge half-closes or `timeout`
    /// passes without a new message.
    pub fn drain_requests(&self, timeout: Duration) -> Vec<StreamingRequest> {
        let mut out = Vec::new();
        while let Some(request) = self.next_request(timeout) {
            out.push(request);
        }
        out
    }

    /// Collect outbound messages until the bridge half-closes.
    ///
    /// Returns `None` if `timeout` passes between two messages without the
    /// bridge half-closing.
    pub fn wait_writes_done(&self, timeout: Duration) -> Option<Vec<StreamingRequest>> {
        let mut out = Vec::new();
        loop {
            match self.requests.recv_timeout(timeout) {
                Ok(request) => out.push(request),
                Err(RecvTimeoutError::Disconnected) => return Some(out),
                Err(RecvTimeoutError::Timeout) => return None,
            }
        }
    }

    /// Push a response to the bridge.  Returns `false` after
    /// [`close`](Self::close) or once the bridge is gone.
    pub fn respond(&self, response: StreamingResponse) -> bool {
        match &self.responses {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// End the inbound direction and publish the terminal status.
    ///
    /// Responses already sent are still delivered before the bridge's
    /// reader observes the end of the stream.
    pub fn close(&mut self, status: StreamStatus) {
        self.responses.take();
        if let Some(tx) = self.status.take() {
            let _ = tx.send(status);
        }
    }
}

impl Drop for RemotePeer {
    fn drop(&mut self) {
        if self.status.is_some() {
            self.close(StreamStatus::new(
                StatusCode::Unavailable,
                "remote peer dropped",
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// LoopbackConnector
// ---------------------------------------------------------------------------

/// A [`Connector`] that creates loopback pairs and publishes each
/// [`RemotePeer`] together with the call id it belongs to.
pub struct LoopbackConnector {
    peers: Mutex<Sender<(String, RemotePeer)>>,
    poll: Duration,
}

impl LoopbackConnector {
    pub fn new(poll: Duration) -> (Self, Receiver<(String, RemotePeer)>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                peers: Mutex::new(tx),
                poll,
            },
            rx,
        )
    }
}

impl Connector for LoopbackConnector {
    fn connect(&self, call_id: &str) -> Result<Box<dyn DuplexTransport>, TransportError> {
        let (transport, peer) = duplex(self.poll);
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send((call_id.to_string(), peer))
            .map_err(|_| TransportError::Connect {
                call_id: call_id.to_string(),
                reason: "no remote service is listening".into(),
            })?;
        Ok(Box::new(transport))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
