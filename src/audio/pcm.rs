//! Little-endian PCM16 byte packing for the wire.

/// Append `samples` to `out` as little-endian 16-bit PCM.
///
/// `out` is cleared first so a single scratch buffer can be reused for every
/// frame; it only reallocates when a frame is larger than any seen before.
pub fn pcm16_to_le_bytes(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Decode little-endian 16-bit PCM.  A trailing odd byte is ignored.
pub fn le_bytes_to_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
