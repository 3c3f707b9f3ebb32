//! Fixed format contract for the live-session audio path.
//!
//! The remote model accepts exactly one capture format and produces exactly
//! one playback format; nothing here is negotiable at runtime.

/// Microphone-side sample rate sent to the model.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of synthesized response audio.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Samples per outbound frame. One frame is 256 ms at 16 kHz.
pub const FRAME_SIZE: usize = 4_096;

/// 16-bit signed PCM.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Mime type attached to every outbound media payload.
pub const PCM_CAPTURE_MIME: &str = "audio/pcm;rate=16000";

/// Billing rate the remote model applies to audio: 75 tokens per second.
pub const AUDIO_TOKENS_PER_SECOND: u32 = 75;
