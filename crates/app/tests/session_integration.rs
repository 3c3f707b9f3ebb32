//! Orchestrator integration tests: scripted transport, manual-time sink.

use async_trait::async_trait;
use echovox_app::session::SessionOrchestrator;
use echovox_audio::codec;
use echovox_audio::constants::{CAPTURE_SAMPLE_RATE, FRAME_SIZE, PCM_CAPTURE_MIME};
use echovox_audio::framer::CaptureFrame;
use echovox_audio::playback::PlaybackScheduler;
use echovox_audio::sink::ManualSink;
use echovox_foundation::SessionError;
use echovox_pricing::compute_cost;
use echovox_protocol::{
    MediaBlob, Modality, ServerMessage, SessionTransport, TokenDetail, UsageMetadata,
};
use echovox_telemetry::PipelineMetrics;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Transport that records outbound media and releases its scripted replies
/// only once the expected number of frames has arrived.
struct ScriptedTransport {
    expect_sends: usize,
    sent: Arc<Mutex<Vec<MediaBlob>>>,
    replies: VecDeque<ServerMessage>,
}

impl ScriptedTransport {
    fn new(expect_sends: usize, replies: Vec<ServerMessage>) -> (Self, Arc<Mutex<Vec<MediaBlob>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                expect_sends,
                sent: sent.clone(),
                replies: replies.into(),
            },
            sent,
        )
    }
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    async fn send_media(&mut self, blob: MediaBlob) -> Result<(), SessionError> {
        self.sent.lock().unwrap().push(blob);
        Ok(())
    }

    async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            if self.sent.lock().unwrap().len() >= self.expect_sends {
                return self.replies.pop_front();
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        }
    }
}

fn capture_frame(value: f32) -> CaptureFrame {
    CaptureFrame {
        samples: vec![value; FRAME_SIZE],
        sample_rate: CAPTURE_SAMPLE_RATE,
        timestamp: Instant::now(),
    }
}

fn audio_payload(samples: &[f32]) -> MediaBlob {
    MediaBlob {
        data: codec::encode_transport(&codec::float_to_pcm16(samples)),
        mime_type: "audio/pcm;rate=24000".to_string(),
    }
}

fn orchestrator(
    transport: ScriptedTransport,
    frame_rx: tokio::sync::broadcast::Receiver<CaptureFrame>,
    metrics: Arc<PipelineMetrics>,
) -> SessionOrchestrator<ManualSink, ScriptedTransport> {
    SessionOrchestrator::new(
        transport,
        frame_rx,
        PlaybackScheduler::new(ManualSink::new()),
        "gemini-2.0-flash-live-001",
        metrics,
    )
}

#[tokio::test]
async fn frames_are_encoded_and_streamed() {
    let (frame_tx, frame_rx) = tokio::sync::broadcast::channel(8);
    frame_tx.send(capture_frame(0.5)).unwrap();
    frame_tx.send(capture_frame(-0.25)).unwrap();
    drop(frame_tx);

    let (transport, sent) = ScriptedTransport::new(2, vec![]);
    let metrics = Arc::new(PipelineMetrics::default());
    let summary = orchestrator(transport, frame_rx, metrics.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.frames_streamed, 2);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|b| b.mime_type == PCM_CAPTURE_MIME));

    // First frame round-trips through the wire encoding
    let bytes = codec::decode_transport(&sent[0].data).unwrap();
    assert_eq!(bytes.len(), FRAME_SIZE * 2);
    let restored = &codec::pcm16_to_float(&bytes, 1)[0];
    assert!(restored.iter().all(|&s| (s - 0.5).abs() <= 1.0 / 32768.0));
}

#[tokio::test]
async fn response_audio_is_scheduled_and_billed() {
    let (frame_tx, frame_rx) = tokio::sync::broadcast::channel(8);
    frame_tx.send(capture_frame(0.1)).unwrap();
    drop(frame_tx);

    let usage = UsageMetadata {
        prompt_tokens_details: vec![TokenDetail {
            modality: Modality::Audio,
            token_count: 20,
        }],
        response_tokens_details: vec![
            TokenDetail {
                modality: Modality::Audio,
                token_count: 45,
            },
            TokenDetail {
                modality: Modality::Text,
                token_count: 12,
            },
        ],
    };
    let reply = ServerMessage {
        audio: vec![audio_payload(&[0.2; 2400]), audio_payload(&[0.3; 4800])],
        transcription: Some("sure, one moment".to_string()),
        usage: Some(usage.clone()),
        ..Default::default()
    };

    let (transport, _sent) = ScriptedTransport::new(1, vec![reply]);
    let metrics = Arc::new(PipelineMetrics::default());
    let summary = orchestrator(transport, frame_rx, metrics.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(metrics.payloads_decoded.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.segments_scheduled.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.decode_failures.load(Ordering::Relaxed), 0);

    let expected = compute_cost("gemini-2.0-flash-live-001", &usage).total_cost;
    assert!((summary.total_cost - expected).abs() < 1e-12);
    assert_eq!(metrics.prompt_tokens.load(Ordering::Relaxed), 20);
    assert_eq!(metrics.response_tokens.load(Ordering::Relaxed), 57);
}

#[tokio::test]
async fn malformed_payload_is_dropped_but_siblings_play() {
    let (frame_tx, frame_rx) = tokio::sync::broadcast::channel(8);
    frame_tx.send(capture_frame(0.1)).unwrap();
    drop(frame_tx);

    let reply = ServerMessage {
        audio: vec![
            MediaBlob {
                data: "***not-base64***".to_string(),
                mime_type: "audio/pcm;rate=24000".to_string(),
            },
            audio_payload(&[0.4; 2400]),
        ],
        ..Default::default()
    };

    let (transport, _sent) = ScriptedTransport::new(1, vec![reply]);
    let metrics = Arc::new(PipelineMetrics::default());
    orchestrator(transport, frame_rx, metrics.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(metrics.decode_failures.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.segments_scheduled.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn barge_in_stops_active_segments() {
    let (frame_tx, frame_rx) = tokio::sync::broadcast::channel(8);
    frame_tx.send(capture_frame(0.1)).unwrap();
    drop(frame_tx);

    let first = ServerMessage {
        audio: vec![audio_payload(&[0.2; 4800]), audio_payload(&[0.2; 4800])],
        ..Default::default()
    };
    let second = ServerMessage {
        interrupted: true,
        ..Default::default()
    };

    let (transport, _sent) = ScriptedTransport::new(1, vec![first, second]);
    let metrics = Arc::new(PipelineMetrics::default());
    orchestrator(transport, frame_rx, metrics.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(metrics.interruptions.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.segments_stopped.load(Ordering::Relaxed), 2);
    assert!(!metrics.is_playing.load(Ordering::Relaxed));
}
