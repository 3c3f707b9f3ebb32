use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring
#[derive(Clone)]
pub struct PipelineMetrics {
    // Audio level monitoring (capture side)
    pub current_peak: Arc<AtomicU64>, // Peak |sample| * 10000 in current window
    pub current_rms: Arc<AtomicU64>,  // RMS * 10000 for precision
    pub audio_level_db: Arc<AtomicI64>, // Current level in dB * 10

    // Pipeline stage tracking
    pub stage_capture: Arc<AtomicBool>,  // Data reached capture stage
    pub stage_framer: Arc<AtomicBool>,   // Data reached framing stage
    pub stage_transport: Arc<AtomicBool>, // Frames handed to transport
    pub stage_playback: Arc<AtomicBool>, // Response audio reached playback

    // Frame rate tracking
    pub capture_fps: Arc<AtomicU64>, // Capture blocks per second * 10
    pub framer_fps: Arc<AtomicU64>,  // Emitted frames per second * 10

    // Event counters
    pub capture_blocks: Arc<AtomicU64>,
    pub frames_streamed: Arc<AtomicU64>,
    pub samples_dropped: Arc<AtomicU64>,
    pub payloads_decoded: Arc<AtomicU64>,
    pub decode_failures: Arc<AtomicU64>,
    pub segments_scheduled: Arc<AtomicU64>,
    pub segments_completed: Arc<AtomicU64>,
    pub segments_stopped: Arc<AtomicU64>,
    pub interruptions: Arc<AtomicU64>,

    // Usage accounting
    pub session_cost_micro_usd: Arc<AtomicU64>, // Running total, USD * 1e6
    pub prompt_tokens: Arc<AtomicU64>,
    pub response_tokens: Arc<AtomicU64>,

    // Activity indicators
    pub is_playing: Arc<AtomicBool>, // Response audio currently scheduled
    pub last_response_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            current_peak: Arc::new(AtomicU64::new(0)),
            current_rms: Arc::new(AtomicU64::new(0)),
            audio_level_db: Arc::new(AtomicI64::new(-900)),

            stage_capture: Arc::new(AtomicBool::new(false)),
            stage_framer: Arc::new(AtomicBool::new(false)),
            stage_transport: Arc::new(AtomicBool::new(false)),
            stage_playback: Arc::new(AtomicBool::new(false)),

            capture_fps: Arc::new(AtomicU64::new(0)),
            framer_fps: Arc::new(AtomicU64::new(0)),

            capture_blocks: Arc::new(AtomicU64::new(0)),
            frames_streamed: Arc::new(AtomicU64::new(0)),
            samples_dropped: Arc::new(AtomicU64::new(0)),
            payloads_decoded: Arc::new(AtomicU64::new(0)),
            decode_failures: Arc::new(AtomicU64::new(0)),
            segments_scheduled: Arc::new(AtomicU64::new(0)),
            segments_completed: Arc::new(AtomicU64::new(0)),
            segments_stopped: Arc::new(AtomicU64::new(0)),
            interruptions: Arc::new(AtomicU64::new(0)),

            session_cost_micro_usd: Arc::new(AtomicU64::new(0)),
            prompt_tokens: Arc::new(AtomicU64::new(0)),
            response_tokens: Arc::new(AtomicU64::new(0)),

            is_playing: Arc::new(AtomicBool::new(false)),
            last_response_time: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    /// Update peak/RMS/dB level indicators from one block of capture samples.
    pub fn update_audio_level(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        self.current_peak
            .store((peak * 10_000.0) as u64, Ordering::Relaxed);

        let sum: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
        let rms = (sum / samples.len() as f64).sqrt();
        self.current_rms
            .store((rms * 10_000.0) as u64, Ordering::Relaxed);

        let db = if peak > 0.0 {
            (20.0 * (peak as f64).log10() * 10.0) as i64
        } else {
            -900
        };
        self.audio_level_db.store(db, Ordering::Relaxed);
    }

    pub fn mark_stage_active(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Capture => self.stage_capture.store(true, Ordering::Relaxed),
            PipelineStage::Framer => self.stage_framer.store(true, Ordering::Relaxed),
            PipelineStage::Transport => self.stage_transport.store(true, Ordering::Relaxed),
            PipelineStage::Playback => self.stage_playback.store(true, Ordering::Relaxed),
        }
    }

    pub fn decay_stages(&self) {
        self.stage_capture.store(false, Ordering::Relaxed);
        self.stage_framer.store(false, Ordering::Relaxed);
        self.stage_transport.store(false, Ordering::Relaxed);
        self.stage_playback.store(false, Ordering::Relaxed);
    }

    pub fn update_capture_fps(&self, fps: f64) {
        self.capture_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_framer_fps(&self, fps: f64) {
        self.framer_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn increment_capture_blocks(&self) {
        self.capture_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_streamed(&self) {
        self.frames_streamed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_samples_dropped(&self, count: usize) {
        self.samples_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn increment_payloads_decoded(&self) {
        self.payloads_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_segments_scheduled(&self) {
        self.segments_scheduled.fetch_add(1, Ordering::Relaxed);
        self.is_playing.store(true, Ordering::Relaxed);
        *self.last_response_time.write() = Some(Instant::now());
    }

    pub fn increment_segments_completed(&self) {
        self.segments_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_segments_stopped(&self, count: usize) {
        self.segments_stopped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn increment_interruptions(&self) {
        self.interruptions.fetch_add(1, Ordering::Relaxed);
        self.is_playing.store(false, Ordering::Relaxed);
    }

    /// Fold one response's cost and token counts into the running session totals.
    pub fn record_usage(&self, cost_usd: f64, prompt_tokens: u64, response_tokens: u64) {
        self.session_cost_micro_usd
            .fetch_add((cost_usd * 1_000_000.0).round() as u64, Ordering::Relaxed);
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed);
        self.response_tokens
            .fetch_add(response_tokens, Ordering::Relaxed);
    }

    pub fn session_cost_usd(&self) -> f64 {
        self.session_cost_micro_usd.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PipelineStage {
    Capture,
    Framer,
    Transport,
    Playback,
}

#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
