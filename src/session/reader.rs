//! The per-session reader thread.
//!
//! [`ReadLoop`] drains the stream until it ends, turns every message into
//! host events, and then finalizes the stream:
//!
//! ```text
//! loop read() ──Some──▶ classify ──▶ on_response (each event)
//!                                └─▶ persist audio ──▶ on_response(AudioProvided)
//!          └──None──▶ finish() ──not ok──▶ on_error
//!                              └─────────▶ on_completion (always, once)
//! ```
//!
//! `finish` is only called after `read` has returned `None`, so every result
//! the remote side sent before its terminal status has been delivered.
//!
//! Before each host callback the loop asks the host whether the call still
//! exists.  If it is gone, the loop stops reading and skips every remaining
//! response and error callback; `on_completion` still fires.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::dispatch::{classify, AudioArtifactWriter, ResultEvent};
use crate::stream::{DuplexStreamClient, StreamStatus};

use super::host::CallHost;

/// How a [`ReadLoop`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLoopExit {
    /// The stream ended and was finalized with this status.
    Drained(StreamStatus),
    /// The host's call disappeared while results were still arriving.
    HostGone,
}

pub struct ReadLoop {
    call_id: String,
    client: Arc<DuplexStreamClient>,
    host: Arc<dyn CallHost>,
    artifacts: AudioArtifactWriter,
}

impl ReadLoop {
    pub fn new(
        client: Arc<DuplexStreamClient>,
        host: Arc<dyn CallHost>,
        artifacts: AudioArtifactWriter,
    ) -> Self {
        Self {
            call_id: client.call_id().to_string(),
            client,
            host,
            artifacts,
        }
    }

    /// Run the loop on a dedicated, named OS thread.
    pub fn spawn(self) -> io::Result<JoinHandle<ReadLoopExit>> {
        std::thread::Builder::new()
            .name(format!("stream-reader-{}", self.call_id))
            .spawn(move || self.run())
    }

    /// Run the loop on the current thread until the stream ends.
    pub fn run(mut self) -> ReadLoopExit {
        log::debug!("reader[{}]: starting", self.call_id);

        let exit = match self.drain() {
            Some(()) => {
                log::debug!("reader[{}]: stream drained", self.call_id);
                let status = self.client.finish();
                if !status.is_ok() {
                    log::error!(
                        "reader[{}]: stream finished with error {status}",
                        self.call_id
                    );
                    if self.host.is_call_active(&self.call_id) {
                        let message = if status.message.is_empty() {
                            status.to_string()
                        } else {
                            status.message.clone()
                        };
                        self.host.on_error(&self.call_id, &message);
                    }
                }
                ReadLoopExit::Drained(status)
            }
            None => {
                log::info!(
                    "reader[{}]: call is gone, dropping remaining results",
                    self.call_id
                );
                ReadLoopExit::HostGone
            }
        };

        self.host.on_completion(&self.call_id);
        log::debug!("reader[{}]: exiting", self.call_id);
        exit
    }

    /// Deliver results until the stream ends (`Some`) or the call is gone
    /// (`None`).
    fn drain(&mut self) -> Option<()> {
        while let Some(response) = self.client.read() {
            let classified = classify(&response);

            for event in &classified.events {
                self.deliver(event)?;
            }

            if let Some(audio) = classified.audio {
                // Skip the disk write entirely if nobody is left to play it.
                if !self.host.is_call_active(&self.call_id) {
                    return None;
                }
                match self.artifacts.write(audio) {
                    Ok(artifact) => {
                        log::debug!(
                            "reader[{}]: wrote {} bytes of audio to {}",
                            self.call_id,
                            artifact.bytes,
                            artifact.path.display()
                        );
                        self.deliver(&ResultEvent::AudioProvided(artifact))?;
                    }
                    Err(e) => {
                        log::error!("reader[{}]: failed to persist audio: {e}", self.call_id);
                    }
                }
            }
        }
        Some(())
    }

    fn deliver(&self, event: &ResultEvent) -> Option<()> {
        if !self.host.is_call_active(&self.call_id) {
            return None;
        }
        log::debug!("reader[{}]: {} event", self.call_id, event.kind());
        self.host.on_response(&self.call_id, event);
        Some(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
