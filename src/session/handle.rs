//! The per-call session handle.
//!
//! A [`SessionHandle`] is shared by two threads:
//!
//! - the **producer** (the host's media thread) calls [`feed`] once per
//!   frame and must never wait;
//! - the **reader** thread drains results (see [`ReadLoop`]).
//!
//! The resampler and the write side of the stream sit behind one mutex.
//! `feed` only ever *tries* that lock and drops the frame when it is held;
//! [`stop`] takes it blocking, half-closes, finalizes, releases both, and
//! then joins the reader.
//!
//! [`feed`]: SessionHandle::feed
//! [`stop`]: SessionHandle::stop
//! [`ReadLoop`]: super::ReadLoop

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, TryLockError};
use std::thread::JoinHandle;

use crate::audio::{pcm16_to_le_bytes, Resampler};
use crate::stream::{DuplexStreamClient, StreamStatus};

use super::reader::ReadLoopExit;

/// What happened to one frame passed to [`SessionHandle::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Resampled audio was written to the stream.
    Sent,
    /// The frame had no samples; nothing was done.
    Empty,
    /// The frame was absorbed by the resampler without completing a block.
    Buffered,
    /// Teardown held the lock; the frame was dropped.
    Busy,
    /// The session has been stopped.
    Closed,
    /// An earlier write failed; the producer no longer writes.
    Halted,
    /// The stream rejected this write.  Later frames return `Halted`.
    Rejected,
    /// The resampler refused the frame; it was dropped.
    ResampleFailed,
}

/// Everything the producer touches, released together on stop.
struct Streaming {
    resampler: Resampler,
    client: Arc<DuplexStreamClient>,
    /// Little-endian bytes of the last resampled chunk, reused per frame.
    pcm: Vec<u8>,
}

pub struct SessionHandle {
    call_id: String,
    guard: Mutex<Option<Streaming>>,
    halted: AtomicBool,
    reader: Mutex<Option<JoinHandle<ReadLoopExit>>>,
    terminal: OnceLock<StreamStatus>,
    dropped: AtomicU64,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("call_id", &self.call_id)
            .field("halted", &self.halted.load(Ordering::Relaxed))
            .field("terminal", &self.terminal.get())
            .field("dropped", &self.dropped_frames())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub(super) fn new(
        resampler: Resampler,
        client: Arc<DuplexStreamClient>,
        reader: JoinHandle<ReadLoopExit>,
    ) -> Self {
        let pcm = Vec::with_capacity(resampler.max_output_samples() * 2);
        Self {
            call_id: client.call_id().to_string(),
            guard: Mutex::new(Some(Streaming {
                resampler,
                client,
                pcm,
            })),
            halted: AtomicBool::new(false),
            reader: Mutex::new(Some(reader)),
            terminal: OnceLock::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Producer entry point: resample one frame of interleaved PCM16 and
    /// write it to the stream.
    ///
    /// Never blocks on the session lock.  If teardown holds it, the frame is
    /// dropped and [`FeedOutcome::Busy`] is returned.
    pub fn feed(&self, frame: &[i16]) -> FeedOutcome {
        if frame.is_empty() {
            return FeedOutcome::Empty;
        }
        if self.halted.load(Ordering::Acquire) {
            return FeedOutcome::Halted;
        }

        let mut guard = match self.guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!(
                    "session[{}]: busy, dropped frame ({dropped} so far)",
                    self.call_id
                );
                return FeedOutcome::Busy;
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let Some(Streaming {
            resampler,
            client,
            pcm,
        }) = guard.as_mut()
        else {
            return FeedOutcome::Closed;
        };

        let resampled = match resampler.process(frame) {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("session[{}]: dropped frame: {e}", self.call_id);
                return FeedOutcome::ResampleFailed;
            }
        };
        if resampled.is_empty() {
            return FeedOutcome::Buffered;
        }

        pcm16_to_le_bytes(resampled, pcm);
        if client.write(pcm.as_slice()) {
            FeedOutcome::Sent
        } else {
            self.halted.store(true, Ordering::Release);
            log::warn!(
                "session[{}]: stream rejected audio, no longer feeding",
                self.call_id
            );
            FeedOutcome::Rejected
        }
    }

    /// Half-close and finalize the stream, release the resampler, and wait
    /// for the reader thread to exit.
    ///
    /// Blocks until the remote side reports its terminal status or the
    /// finish timeout passes.  Every call returns the same status.
    ///
    /// When called from a host callback (i.e. on the reader thread) the
    /// reader is not joined; it exits on its own once the stream is drained.
    pub fn stop(&self) -> StreamStatus {
        let status = self.terminal.get_or_init(|| self.teardown()).clone();
        self.join_reader();
        status
    }

    fn teardown(&self) -> StreamStatus {
        let mut guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(Streaming {
            resampler, client, ..
        }) = guard.take()
        else {
            return StreamStatus::ok();
        };

        log::info!("session[{}]: stopping", self.call_id);
        client.half_close();
        let status = client.finish();

        // Finalized stream first, then the resampler.
        drop(resampler);
        drop(client);

        let dropped = self.dropped_frames();
        if dropped > 0 {
            log::info!(
                "session[{}]: {dropped} frames dropped under contention",
                self.call_id
            );
        }
        log::info!("session[{}]: stopped ({status})", self.call_id);
        status
    }

    fn join_reader(&self) {
        let mut slot = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = slot.take() else {
            return;
        };

        if handle.thread().id() == std::thread::current().id() {
            log::debug!(
                "session[{}]: stop called from the reader, not joining",
                self.call_id
            );
            *slot = Some(handle);
            return;
        }
        drop(slot);

        match handle.join() {
            Ok(exit) => log::debug!("session[{}]: reader exited: {exit:?}", self.call_id),
            Err(_) => log::error!("session[{}]: reader thread panicked", self.call_id),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Frames dropped because teardown held the session lock.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// `None` until [`stop`](Self::stop) has finalized the stream.
    pub fn terminal_status(&self) -> Option<&StreamStatus> {
        self.terminal.get()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.terminal.get().is_none() {
            log::debug!("session[{}]: dropped without stop", self.call_id);
        }
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
