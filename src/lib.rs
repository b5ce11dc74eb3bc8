//! Bridges live call audio to a remote speech/intent duplex stream.
//!
//! A host creates one [`session::Bridge`] per process and calls
//! [`session::Bridge::start_session`] per call.  It then feeds frames to the
//! returned [`session::SessionHandle`] and receives results through its
//! [`session::CallHost`] implementation.

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod session;
pub mod stream;
