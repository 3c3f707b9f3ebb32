//! Session orchestration: the capture/transport/playback loop.
//!
//! The orchestrator is a thin caller around the core components. It pulls
//! frames off the capture pipeline, encodes them for the wire, forwards
//! inbound server messages to the playback scheduler and the cost model, and
//! applies barge-in. All playback state lives in the scheduler; all pricing
//! state lives in the price table.

use std::sync::Arc;

use echovox_audio::codec;
use echovox_audio::constants::PCM_CAPTURE_MIME;
use echovox_audio::framer::CaptureFrame;
use echovox_audio::playback::{AudioSink, DecodedSegment, PlaybackScheduler};
use echovox_foundation::{AppError, SessionError};
use echovox_pricing::compute_cost;
use echovox_protocol::{MediaBlob, ServerMessage, SessionTransport};
use echovox_telemetry::{PipelineMetrics, PipelineStage};
use tokio::sync::broadcast;

/// Totals reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSummary {
    pub total_cost: f64,
    pub frames_streamed: u64,
    pub segments_played: u64,
}

pub struct SessionOrchestrator<S: AudioSink, T: SessionTransport> {
    transport: T,
    frame_rx: broadcast::Receiver<CaptureFrame>,
    scheduler: PlaybackScheduler<S>,
    model_id: String,
    metrics: Arc<PipelineMetrics>,
    summary: SessionSummary,
}

impl<S: AudioSink, T: SessionTransport> SessionOrchestrator<S, T> {
    pub fn new(
        transport: T,
        frame_rx: broadcast::Receiver<CaptureFrame>,
        scheduler: PlaybackScheduler<S>,
        model_id: impl Into<String>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            transport,
            frame_rx,
            scheduler,
            model_id: model_id.into(),
            metrics,
            summary: SessionSummary::default(),
        }
    }

    /// Drive the session until the transport closes or the capture side shuts
    /// down with no messages left.
    pub async fn run(mut self) -> Result<SessionSummary, AppError> {
        let mut frames_open = true;

        loop {
            tokio::select! {
                frame = self.frame_rx.recv(), if frames_open => match frame {
                    Ok(frame) => self.send_frame(frame).await?,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "Capture frames lagged; transport too slow");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Capture side closed");
                        frames_open = false;
                    }
                },
                msg = self.transport.recv() => match msg {
                    Some(msg) => self.handle_message(msg),
                    None => {
                        tracing::info!("Transport closed by remote");
                        break;
                    }
                },
            }
        }

        Ok(self.summary)
    }

    async fn send_frame(&mut self, frame: CaptureFrame) -> Result<(), SessionError> {
        let pcm = codec::float_to_pcm16(&frame.samples);
        tracing::trace!(
            bytes = pcm.len(),
            est_tokens = codec::estimate_audio_tokens(pcm.len()),
            "Streaming capture frame"
        );

        let blob = MediaBlob {
            data: codec::encode_transport(&pcm),
            mime_type: PCM_CAPTURE_MIME.to_string(),
        };
        self.transport.send_media(blob).await?;

        self.summary.frames_streamed += 1;
        self.metrics.increment_frames_streamed();
        self.metrics.mark_stage_active(PipelineStage::Transport);
        Ok(())
    }

    /// Process one inbound message: barge-in first, then audio payloads in
    /// arrival order, then transcription and usage.
    fn handle_message(&mut self, msg: ServerMessage) {
        for _ in self.scheduler.reap() {
            self.summary.segments_played += 1;
            self.metrics.increment_segments_completed();
        }

        if msg.interrupted {
            let stopped = self.scheduler.interrupt();
            self.metrics.add_segments_stopped(stopped);
            self.metrics.increment_interruptions();
        }

        // Each payload is decoded before the next is enqueued, so enqueue
        // order is exactly the order the audio should be heard.
        for blob in &msg.audio {
            match codec::decode_audio_payload(&blob.data) {
                Ok(samples) if !samples.is_empty() => {
                    self.metrics.increment_payloads_decoded();
                    self.scheduler.enqueue(DecodedSegment::new(samples));
                    self.metrics.increment_segments_scheduled();
                    self.metrics.mark_stage_active(PipelineStage::Playback);
                }
                Ok(_) => {}
                Err(e) => {
                    // Drop this segment only; siblings still play.
                    tracing::warn!("Discarding undecodable audio payload: {}", e);
                    self.metrics.increment_decode_failures();
                }
            }
        }

        if let Some(text) = &msg.transcription {
            tracing::info!(transcript = %text, "Model said");
        }

        if let Some(usage) = &msg.usage {
            let breakdown = compute_cost(&self.model_id, usage);
            self.summary.total_cost += breakdown.total_cost;
            self.metrics.record_usage(
                breakdown.total_cost,
                usage.total_prompt_tokens(),
                usage.total_response_tokens(),
            );
            tracing::debug!(
                input_cost = breakdown.input_cost,
                output_cost = breakdown.output_cost,
                session_total = self.summary.total_cost,
                "Usage billed"
            );
        }

        if msg.turn_complete {
            tracing::debug!("Turn complete");
        }
    }
}
