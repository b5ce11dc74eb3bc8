//! Streaming PCM16 sample-rate conversion for call audio.
//!
//! Telephony legs deliver narrowband (8 kHz) 16-bit PCM; the remote speech
//! service wants wideband (16 kHz).  [`Resampler`] wraps a
//! `rubato::FftFixedInOut` and adapts it to the host's frame cadence:
//!
//! 1. Incoming interleaved `i16` samples are staged in a pending block.
//! 2. Every time a full processing block is available it is deinterleaved,
//!    converted to `f32` and run through the FFT resampler.
//! 3. The result is converted back to interleaved `i16` in an output buffer
//!    that was sized once, at construction, for the worst-case frame.
//!
//! Frames shorter than a processing block are held over to the next call, so
//! the filter state is continuous across frames and no allocation happens on
//! the hot path.

use rubato::{FftFixedInOut, Resampler as _};
use thiserror::Error;

/// Highest channel count accepted by [`Resampler::new`].
pub const MAX_CHANNELS: u16 = 8;

// ---------------------------------------------------------------------------
// ResampleError
// ---------------------------------------------------------------------------

/// Errors raised while building or running a [`Resampler`].
#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("unsupported channel count {0} (expected 1..={MAX_CHANNELS})")]
    UnsupportedChannels(u16),

    #[error("unsupported rate pair {input} Hz -> {output} Hz")]
    UnsupportedRate { input: u32, output: u32 },

    #[error("failed to construct resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),

    /// The frame is larger than the `max_input_frames` the buffers were
    /// sized for.
    #[error("frame of {frames} frames exceeds the configured maximum of {max}")]
    FrameTooLarge { frames: usize, max: usize },
}

// ---------------------------------------------------------------------------
// Resampler
// ---------------------------------------------------------------------------

/// Stateful, per-session PCM16 rate converter.
///
/// Input and output rates are fixed at construction.  Input frame sizes may
/// vary between calls up to `max_input_frames`.
pub struct Resampler {
    inner: FftFixedInOut<f32>,
    channels: usize,
    input_rate: u32,
    output_rate: u32,
    /// Frames per processing block, as chosen by rubato.
    block_frames: usize,
    max_input_frames: usize,
    /// Interleaved samples waiting for a full block.
    pending: Vec<i16>,
    input_buf: Vec<Vec<f32>>,
    output_buf: Vec<Vec<f32>>,
    /// Interleaved output of the most recent [`process`](Self::process) call.
    out: Vec<i16>,
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("channels", &self.channels)
            .field("input_rate", &self.input_rate)
            .field("output_rate", &self.output_rate)
            .field("block_frames", &self.block_frames)
            .field("max_input_frames", &self.max_input_frames)
            .finish_non_exhaustive()
    }
}

impl Resampler {
    /// Build a resampler converting `input_rate` to `output_rate`.
    ///
    /// * `block_frames`: requested processing block length in frames;
    ///   rubato may round it to a length compatible with the rate ratio.
    /// * `max_input_frames`: largest frame a single [`process`](Self::process)
    ///   call will accept.  All scratch space is sized from this value.
    ///
    /// # Errors
    ///
    /// [`ResampleError::UnsupportedChannels`] / [`ResampleError::UnsupportedRate`]
    /// for parameters outside the supported range, or
    /// [`ResampleError::Construction`] when rubato rejects the configuration.
    pub fn new(
        channels: u16,
        input_rate: u32,
        output_rate: u32,
        block_frames: usize,
        max_input_frames: usize,
    ) -> Result<Self, ResampleError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(ResampleError::UnsupportedChannels(channels));
        }
        if input_rate == 0 || output_rate == 0 || block_frames == 0 {
            return Err(ResampleError::UnsupportedRate {
                input: input_rate,
                output: output_rate,
            });
        }

        let channels = channels as usize;
        let inner = FftFixedInOut::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            block_frames,
            channels,
        )?;

        let block_frames = inner.input_frames_next();
        let block_out = inner.output_frames_max();
        let input_buf = inner.input_buffer_allocate(true);
        let output_buf = inner.output_buffer_allocate(true);

        // Worst case: a full pending block (minus one frame) plus the largest
        // frame, flushed as whole blocks.
        let max_blocks = (max_input_frames + block_frames).div_ceil(block_frames);
        let out = Vec::with_capacity(max_blocks * block_out * channels);

        log::debug!(
            "resampler: {input_rate} Hz -> {output_rate} Hz, {channels} ch, block {block_frames} -> {block_out} frames"
        );

        Ok(Self {
            inner,
            channels,
            input_rate,
            output_rate,
            block_frames,
            max_input_frames,
            pending: Vec::with_capacity(block_frames * channels),
            input_buf,
            output_buf,
            out,
        })
    }

    /// Resample one frame of interleaved samples.
    ///
    /// Returns the interleaved output produced by every block completed by
    /// this frame.  The slice may be empty when the frame did not complete a
    /// block; the held-over samples are emitted by a later call.  A trailing
    /// partial frame (fewer samples than `channels`) is ignored.
    pub fn process(&mut self, input: &[i16]) -> Result<&[i16], ResampleError> {
        let frames = input.len() / self.channels;
        if frames > self.max_input_frames {
            return Err(ResampleError::FrameTooLarge {
                frames,
                max: self.max_input_frames,
            });
        }

        self.out.clear();
        let block_samples = self.block_frames * self.channels;
        let mut remaining = &input[..frames * self.channels];

        while !remaining.is_empty() {
            let take = (block_samples - self.pending.len()).min(remaining.len());
            self.pending.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            if self.pending.len() == block_samples {
                self.run_block()?;
                self.pending.clear();
            }
        }

        Ok(&self.out)
    }

    /// Push the pending block through the filter and append to `out`.
    fn run_block(&mut self) -> Result<(), ResampleError> {
        for (frame_idx, frame) in self.pending.chunks_exact(self.channels).enumerate() {
            for (ch, &sample) in frame.iter().enumerate() {
                self.input_buf[ch][frame_idx] = f32::from(sample) / 32_768.0;
            }
        }

        let (_, written) = self
            .inner
            .process_into_buffer(&self.input_buf, &mut self.output_buf, None)?;

        for frame_idx in 0..written {
            for ch in 0..self.channels {
                self.out.push(to_i16(self.output_buf[ch][frame_idx]));
            }
        }
        Ok(())
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels as u16
    }

    /// Input sample rate in Hz.
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Output sample rate in Hz.
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Frames consumed per processing block.
    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    /// Delay introduced by the filter, in output frames.
    pub fn delay_frames(&self) -> usize {
        self.inner.output_delay()
    }

    /// Capacity of the output buffer in samples; never exceeded by
    /// [`process`](Self::process).
    pub fn max_output_samples(&self) -> usize {
        self.out.capacity()
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32_768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn narrowband() -> Resampler {
        // 10 ms blocks at 8 kHz, up to 1920 samples per frame
        Resampler::new(1, 8_000, 16_000, 80, 1_920).expect("resampler")
    }

    fn tone(len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| ((i as f32 * 0.3).sin() * 8_000.0) as i16)
            .collect()
    }

    #[test]
    fn zero_channels_is_rejected() {
        let err = Resampler::new(0, 8_000, 16_000, 80, 1_920).unwrap_err();
        assert!(matches!(err, ResampleError::UnsupportedChannels(0)));
    }

    #[test]
    fn too_many_channels_is_rejected() {
        let err = Resampler::new(MAX_CHANNELS + 1, 8_000, 16_000, 80, 1_920).unwrap_err();
        assert!(matches!(err, ResampleError::UnsupportedChannels(_)));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let err = Resampler::new(1, 0, 16_000, 80, 1_920).unwrap_err();
        assert!(matches!(err, ResampleError::UnsupportedRate { input: 0, .. }));
    }

    #[test]
    fn twenty_ms_frame_doubles_in_length() {
        let mut r = narrowband();
        let out = r.process(&tone(160)).expect("process");
        assert_eq!(out.len(), 320);
    }

    #[test]
    fn output_is_deterministic() {
        let input = tone(160);
        let mut a = narrowband();
        let mut b = narrowband();

        for _ in 0..5 {
            let out_a = a.process(&input).expect("a").to_vec();
            let out_b = b.process(&input).expect("b").to_vec();
            assert_eq!(out_a, out_b);
        }
    }

    #[test]
    fn short_frames_are_held_until_a_block_completes() {
        let mut r = narrowband();
        let block = r.block_frames();

        let first = r.process(&tone(block / 2)).expect("first").len();
        assert_eq!(first, 0);

        let second = r.process(&tone(block / 2)).expect("second").len();
        assert_eq!(second, block * 2);
    }

    #[test]
    fn empty_frame_produces_no_output() {
        let mut r = narrowband();
        assert!(r.process(&[]).expect("empty").is_empty());
    }

    #[test]
    fn silence_stays_silent() {
        let mut r = narrowband();
        let out = r.process(&[0_i16; 320]).expect("process");
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut r = narrowband();
        let err = r.process(&vec![0_i16; 1_921]).unwrap_err();
        assert!(matches!(
            err,
            ResampleError::FrameTooLarge { frames: 1_921, max: 1_920 }
        ));
    }

    #[test]
    fn output_never_exceeds_preallocated_capacity() {
        let mut r = narrowband();
        let cap = r.max_output_samples();
        // Leave a partial block pending, then send the largest frame.
        r.process(&tone(r.block_frames() - 1)).expect("partial");
        let out = r.process(&tone(1_920)).expect("max frame");
        assert!(out.len() <= cap, "{} > {cap}", out.len());
        assert_eq!(r.max_output_samples(), cap);
    }

    #[test]
    fn stereo_keeps_interleaving() {
        let mut r = Resampler::new(2, 8_000, 16_000, 80, 960).expect("stereo");
        let input = vec![0_i16; 160 * 2];
        let out = r.process(&input).expect("process");
        assert_eq!(out.len(), 320 * 2);
    }
}
