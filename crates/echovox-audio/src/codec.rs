//! Sample-format and transport-encoding conversions.
//!
//! Everything here is a pure function over byte/sample slices. The wire
//! format is little-endian 16-bit signed PCM, carried as standard base64.

use crate::constants::{AUDIO_TOKENS_PER_SECOND, BYTES_PER_SAMPLE, CAPTURE_SAMPLE_RATE};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use echovox_foundation::SessionError;

/// Pack float samples into little-endian 16-bit PCM bytes.
///
/// Each sample is scaled by 32768 and narrowed. Callers supply pre-clamped
/// input in [-1.0, 1.0]; out-of-range values take whatever the cast gives.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        let value = (sample * 32768.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Unpack little-endian 16-bit PCM bytes into per-channel float sequences.
///
/// Interleaved samples are split by index modulo `channels`; each channel
/// sequence has `bytes.len() / 2 / channels` samples. A trailing odd byte is
/// ignored.
pub fn pcm16_to_float(bytes: &[u8], channels: usize) -> Vec<Vec<f32>> {
    debug_assert!(channels > 0);
    let per_channel = bytes.len() / BYTES_PER_SAMPLE / channels;
    let mut out = vec![Vec::with_capacity(per_channel); channels];
    for (i, pair) in bytes.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        out[i % channels].push(value as f32 / 32768.0);
    }
    out
}

/// Text-safe transport encoding of raw PCM bytes.
pub fn encode_transport(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Exact inverse of [`encode_transport`].
pub fn decode_transport(text: &str) -> Result<Vec<u8>, SessionError> {
    STANDARD
        .decode(text)
        .map_err(|e| SessionError::MalformedPayload(e.to_string()))
}

/// Decode one inline audio payload into mono float samples.
pub fn decode_audio_payload(data: &str) -> Result<Vec<f32>, SessionError> {
    let bytes = decode_transport(data)?;
    let mut channels = pcm16_to_float(&bytes, 1);
    Ok(channels.remove(0))
}

/// Estimate how many audio tokens the model will bill for a capture payload.
///
/// `ceil(seconds * 75)` for the fixed 16 kHz / 16-bit mono capture format.
/// This is a client-side estimate only; authoritative counts arrive in the
/// response usage metadata.
pub fn estimate_audio_tokens(byte_len: usize) -> u32 {
    let seconds =
        byte_len as f64 / (CAPTURE_SAMPLE_RATE as f64 * BYTES_PER_SAMPLE as f64);
    (seconds * AUDIO_TOKENS_PER_SECOND as f64).ceil() as u32
}
