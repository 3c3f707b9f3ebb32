//! Development transport: a local stand-in for the remote model session.
//!
//! `ToneTransport` lets the whole pipeline run end-to-end with no network or
//! credentials: it consumes outbound media like a real session would and
//! answers every few frames with a short synthesized tone plus usage
//! metadata shaped like the real thing. Swap in a real `SessionTransport`
//! implementation to talk to an actual model endpoint.

use async_trait::async_trait;
use echovox_audio::codec;
use echovox_audio::constants::PLAYBACK_SAMPLE_RATE;
use echovox_foundation::SessionError;
use echovox_protocol::{
    MediaBlob, Modality, ServerMessage, SessionTransport, TokenDetail, UsageMetadata,
};
use std::collections::VecDeque;
use tokio::time::{sleep, Duration};

/// Frames consumed per synthesized response.
const FRAMES_PER_REPLY: u64 = 8;

pub struct ToneTransport {
    pending_replies: VecDeque<ServerMessage>,
    frames_received: u64,
    bytes_received: usize,
    closed: bool,
}

impl ToneTransport {
    pub fn new() -> Self {
        Self {
            pending_replies: VecDeque::new(),
            frames_received: 0,
            bytes_received: 0,
            closed: false,
        }
    }

    fn synthesize_reply(&mut self) -> ServerMessage {
        // 200 ms of A440 at the playback rate
        let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE / 5)
            .map(|i| {
                let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
                (t * 440.0 * std::f32::consts::TAU).sin() * 0.3
            })
            .collect();
        let pcm = codec::float_to_pcm16(&samples);

        let prompt_audio_tokens = codec::estimate_audio_tokens(self.bytes_received);
        self.bytes_received = 0;

        ServerMessage {
            audio: vec![MediaBlob {
                data: codec::encode_transport(&pcm),
                mime_type: format!("audio/pcm;rate={}", PLAYBACK_SAMPLE_RATE),
            }],
            transcription: Some("(tone)".to_string()),
            usage: Some(UsageMetadata {
                prompt_tokens_details: vec![TokenDetail {
                    modality: Modality::Audio,
                    token_count: prompt_audio_tokens,
                }],
                response_tokens_details: vec![TokenDetail {
                    modality: Modality::Audio,
                    token_count: 15, // 200 ms at 75 tokens/s
                }],
            }),
            interrupted: false,
            turn_complete: true,
        }
    }
}

impl Default for ToneTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionTransport for ToneTransport {
    async fn send_media(&mut self, blob: MediaBlob) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::TransportClosed);
        }
        self.bytes_received += codec::decode_transport(&blob.data)?.len();
        self.frames_received += 1;
        if self.frames_received % FRAMES_PER_REPLY == 0 {
            let reply = self.synthesize_reply();
            self.pending_replies.push_back(reply);
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            if let Some(msg) = self.pending_replies.pop_front() {
                return Some(msg);
            }
            if self.closed {
                return None;
            }
            sleep(Duration::from_millis(20)).await;
        }
    }
}
