//! Duplex streaming to the remote speech/intent service.
//!
//! # Architecture
//!
//! ```text
//!   producer (per frame)              reader thread
//!          │ write                         ▲ read
//!          ▼                               │
//! ┌──────────────────────────────────────────────────┐
//! │            DuplexStreamClient (Arc)              │
//! │  config-first framing, Open/HalfClosed/Finished  │
//! └──────────────────────┬───────────────────────────┘
//!                        │ Box<dyn DuplexTransport>
//!                        ▼
//!        LoopbackTransport ⇄ RemotePeer   (or any other transport)
//! ```

pub mod client;
pub mod loopback;
pub mod protocol;
pub mod transport;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{intent_session_path, DuplexStreamClient, StreamSetup, StreamState};
pub use loopback::{duplex, LoopbackConnector, LoopbackTransport, RemotePeer};
pub use protocol::{
    AudioEncoding, EventInput, InputAudioConfig, QueryResult, RecognitionKind,
    RecognitionResult, RemoteProfile, SpeechAlternative, StatusCode, StreamStatus, StreamingConfig,
    StreamingRequest, StreamingResponse,
};
pub use transport::{Connector, DuplexTransport, TransportError};
