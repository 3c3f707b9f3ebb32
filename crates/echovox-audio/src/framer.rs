use std::time::Instant;

/// One transport-sized block of capture audio: exactly `frame_size` mono
/// samples in [-1.0, 1.0].
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub timestamp: Instant,
}

/// Outcome of one [`Framer::append`] call.
///
/// A call fills at most the space remaining in the current frame, so it can
/// complete at most one frame. Samples beyond the remaining space are dropped,
/// not carried into the next frame; `dropped` reports how many.
#[derive(Debug, Default)]
pub struct AppendResult {
    pub frame: Option<CaptureFrame>,
    pub dropped: usize,
}

/// Accumulates variable-length capture blocks into fixed-size frames.
///
/// Runs at audio cadence: `append` never blocks and only allocates when a
/// frame is emitted (the internal buffer is reused).
pub struct Framer {
    buffer: Vec<f32>,
    cursor: usize,
    frame_size: usize,
    sample_rate: u32,
    samples_emitted: u64,
    start_time: Instant,
}

impl Framer {
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        Self {
            buffer: vec![0.0; frame_size],
            cursor: 0,
            frame_size,
            sample_rate,
            samples_emitted: 0,
            start_time: Instant::now(),
        }
    }

    /// Copy as much of `samples` as fits into the current frame.
    ///
    /// Empty input is a no-op. When the frame fills, an immutable copy is
    /// emitted and the buffer is reset for the next frame. Overflow beyond
    /// the remaining space is dropped; callers surface the count.
    pub fn append(&mut self, samples: &[f32]) -> AppendResult {
        if samples.is_empty() {
            return AppendResult::default();
        }

        let space = self.frame_size - self.cursor;
        let take = samples.len().min(space);
        self.buffer[self.cursor..self.cursor + take].copy_from_slice(&samples[..take]);
        self.cursor += take;

        let dropped = samples.len() - take;
        if dropped > 0 {
            tracing::warn!(dropped, "Capture block exceeded frame space; samples dropped");
        }

        let frame = if self.cursor == self.frame_size {
            self.cursor = 0;

            // Timestamp from the emitted-sample count, not wall clock, so
            // frames stay evenly spaced under scheduling jitter.
            let timestamp_ms =
                self.samples_emitted as u128 * 1000 / self.sample_rate as u128;
            let timestamp =
                self.start_time + std::time::Duration::from_millis(timestamp_ms as u64);
            self.samples_emitted += self.frame_size as u64;

            Some(CaptureFrame {
                samples: self.buffer.clone(),
                sample_rate: self.sample_rate,
                timestamp,
            })
        } else {
            None
        };

        AppendResult { frame, dropped }
    }

    /// Samples buffered toward the next frame.
    pub fn pending(&self) -> usize {
        self.cursor
    }
}
