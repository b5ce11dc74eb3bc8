//! Call audio ingestion: PCM16 resampling and wire packing.
//!
//! # Pipeline
//!
//! ```text
//! host frame (i16 @ 8 kHz) → Resampler (FFT, stateful) → i16 @ 16 kHz
//!                          → pcm16_to_le_bytes → audio chunk message
//! ```
//!
//! Both steps write into buffers allocated once per session, so the producer
//! path never allocates once warmed up.

pub mod pcm;
pub mod resample;

pub use pcm::{le_bytes_to_pcm16, pcm16_to_le_bytes};
pub use resample::{ResampleError, Resampler, MAX_CHANNELS};
