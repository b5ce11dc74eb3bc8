//! Per-call sessions: lifecycle, producer path and result delivery.
//!
//! # Architecture
//!
//! ```text
//!  host media thread                       reader thread (one per call)
//!        │ feed(frame)                            │
//!        ▼                                        ▼
//! ┌─────────────────────────┐           ┌─────────────────────┐
//! │ SessionHandle           │           │ ReadLoop            │
//! │  try_lock ─▶ Resampler  │           │  read ─▶ classify   │
//! │          ─▶ write       │           │  ─▶ CallHost        │
//! │ stop: lock, half-close, │           │  finish ─▶ on_error │
//! │  finish, join reader    │           │  on_completion      │
//! └───────────┬─────────────┘           └──────────┬──────────┘
//!             └──────── Arc<DuplexStreamClient> ───┘
//! ```
//!
//! [`Bridge::start_session`] is the only way to obtain a [`SessionHandle`].

pub mod bridge;
pub mod handle;
pub mod host;
pub mod reader;

#[cfg(test)]
mod harness;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use bridge::{Bridge, SessionError};
pub use handle::{FeedOutcome, SessionHandle};
pub use host::CallHost;
pub use reader::{ReadLoop, ReadLoopExit};
