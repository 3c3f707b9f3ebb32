use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::capture::RawBlock;
use crate::constants::{CAPTURE_SAMPLE_RATE, FRAME_SIZE};
use crate::framer::{CaptureFrame, Framer};
use crate::resampler::StreamResampler;
use echovox_telemetry::{FpsTracker, PipelineMetrics, PipelineStage};

pub struct PipelineConfig {
    pub frame_size: usize,
    pub sample_rate_hz: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_size: FRAME_SIZE,
            sample_rate_hz: CAPTURE_SAMPLE_RATE,
        }
    }
}

/// Turns raw device blocks into fixed-size transport frames: downmix to
/// mono, resample to the capture rate, accumulate through the [`Framer`],
/// broadcast emitted frames.
pub struct CapturePipeline {
    block_rx: Receiver<RawBlock>,
    output_tx: broadcast::Sender<CaptureFrame>,
    cfg: PipelineConfig,
    running: Arc<AtomicBool>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl CapturePipeline {
    pub fn new(
        block_rx: Receiver<RawBlock>,
        output_tx: broadcast::Sender<CaptureFrame>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            block_rx,
            output_tx,
            cfg,
            running: Arc::new(AtomicBool::new(false)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let mut worker = PipelineWorker::new(self.block_rx, self.output_tx, self.cfg, self.metrics);
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        tokio::spawn(async move {
            worker.run(running).await;
        })
    }
}

struct PipelineWorker {
    block_rx: Receiver<RawBlock>,
    output_tx: broadcast::Sender<CaptureFrame>,
    framer: Framer,
    metrics: Option<Arc<PipelineMetrics>>,
    capture_fps_tracker: FpsTracker,
    framer_fps_tracker: FpsTracker,
    // Resampling state
    resampler: Option<StreamResampler>,
    current_input_rate: Option<u32>,
    current_input_channels: Option<u16>,
    target_rate: u32,
}

impl PipelineWorker {
    fn new(
        block_rx: Receiver<RawBlock>,
        output_tx: broadcast::Sender<CaptureFrame>,
        cfg: PipelineConfig,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> Self {
        Self {
            block_rx,
            output_tx,
            framer: Framer::new(cfg.frame_size, cfg.sample_rate_hz),
            metrics,
            capture_fps_tracker: FpsTracker::new(),
            framer_fps_tracker: FpsTracker::new(),
            resampler: None,
            current_input_rate: None,
            current_input_channels: None,
            target_rate: cfg.sample_rate_hz,
        }
    }

    async fn run(&mut self, running: Arc<AtomicBool>) {
        tracing::info!("Capture pipeline started");

        while running.load(Ordering::SeqCst) {
            match self.block_rx.try_recv() {
                Ok(block) => self.process_block(block),
                Err(TryRecvError::Empty) => {
                    // Host capture callbacks land every 10-20ms; polling at
                    // 10ms keeps latency low without spinning.
                    time::sleep(Duration::from_millis(10)).await;
                }
                Err(TryRecvError::Disconnected) => {
                    tracing::info!("Capture channel closed");
                    break;
                }
            }
        }

        tracing::info!("Capture pipeline stopped");
    }

    fn process_block(&mut self, block: RawBlock) {
        if let Some(m) = &self.metrics {
            m.increment_capture_blocks();
            if let Some(fps) = self.capture_fps_tracker.tick() {
                m.update_capture_fps(fps);
            }
            m.update_audio_level(&block.samples);
            m.mark_stage_active(PipelineStage::Capture);
        }

        if self.current_input_rate != Some(block.sample_rate)
            || self.current_input_channels != Some(block.channels)
        {
            self.reconfigure_for_device(&block);
        }

        let mono = self.downmix(&block);
        let resampled = match &mut self.resampler {
            Some(rs) => rs.process(&mono),
            None => mono,
        };
        if resampled.is_empty() {
            return;
        }

        let result = self.framer.append(&resampled);
        if result.dropped > 0 {
            if let Some(m) = &self.metrics {
                m.add_samples_dropped(result.dropped);
            }
        }
        if let Some(frame) = result.frame {
            // A send on a broadcast channel fails only when no one is
            // listening, which is not an error for the pipeline.
            if self.output_tx.send(frame).is_err() {
                tracing::warn!("No active listeners for capture frames");
            }
            if let Some(m) = &self.metrics {
                if let Some(fps) = self.framer_fps_tracker.tick() {
                    m.update_framer_fps(fps);
                }
                m.mark_stage_active(PipelineStage::Framer);
            }
        }
    }

    fn reconfigure_for_device(&mut self, block: &RawBlock) {
        if block.sample_rate != self.target_rate {
            tracing::info!(
                "Configuring resampler: {}Hz {} ch -> {}Hz mono",
                block.sample_rate,
                block.channels,
                self.target_rate
            );
            self.resampler = Some(StreamResampler::new(block.sample_rate, self.target_rate));
        } else {
            tracing::info!(
                "Device already at target rate {}Hz, no resampling needed",
                block.sample_rate
            );
            self.resampler = None;
        }

        self.current_input_rate = Some(block.sample_rate);
        self.current_input_channels = Some(block.channels);
    }

    fn downmix(&self, block: &RawBlock) -> Vec<f32> {
        if block.channels == 1 {
            return block.samples.clone();
        }
        let channels = block.channels as usize;
        block
            .samples
            .chunks_exact(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}
