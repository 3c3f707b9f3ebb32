//! Gapless playback scheduling for response audio.
//!
//! The scheduler owns the playback timeline: segments are placed back to
//! back on the sink's monotonic clock, and barge-in tears the whole timeline
//! down at once. All playback state changes go through [`PlaybackScheduler`];
//! nothing else touches the sink's schedule.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::PLAYBACK_SAMPLE_RATE;

pub type SegmentId = u64;

/// Lifecycle of one response segment.
///
/// `Decoded → Scheduled → Playing → Ended`, with `Stopped` reachable from
/// `Scheduled` or `Playing` via [`PlaybackScheduler::interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Decoded,
    Scheduled,
    Playing,
    Ended,
    Stopped,
}

/// One decoded unit of response audio, ready to be scheduled.
#[derive(Debug, Clone)]
pub struct DecodedSegment {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedSegment {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: PLAYBACK_SAMPLE_RATE,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Output seam the scheduler drives.
///
/// `position()` is the sink's monotonic output clock; `schedule` places a
/// segment at an absolute time on that clock. Implementations report natural
/// completions through `drain_ended`.
pub trait AudioSink {
    fn position(&self) -> Duration;
    fn schedule(&mut self, id: SegmentId, segment: &DecodedSegment, start: Duration);
    fn stop(&mut self, id: SegmentId);
    fn drain_ended(&mut self) -> Vec<SegmentId>;
}

#[derive(Debug, Clone, Copy)]
struct ActiveSegment {
    start: Duration,
    end: Duration,
}

/// Maintains the ordered timeline of scheduled response segments.
///
/// Exclusive owner of `next_start` and the active set; callers interact only
/// through `enqueue`, `interrupt`, and `reap`.
pub struct PlaybackScheduler<S: AudioSink> {
    sink: S,
    next_start: Duration,
    next_id: SegmentId,
    active: HashMap<SegmentId, ActiveSegment>,
}

impl<S: AudioSink> PlaybackScheduler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            next_start: Duration::ZERO,
            next_id: 0,
            active: HashMap::new(),
        }
    }

    /// Schedule a decoded segment to play immediately after the last one.
    ///
    /// The start time is `max(next_start, clock)`: back to back with the
    /// previous segment, but never in the past. Callers must enqueue in the
    /// order segments should be heard.
    pub fn enqueue(&mut self, segment: DecodedSegment) -> SegmentId {
        self.reap();

        let now = self.sink.position();
        let start = self.next_start.max(now);
        let end = start + segment.duration();

        let id = self.next_id;
        self.next_id += 1;

        self.sink.schedule(id, &segment, start);
        self.active.insert(id, ActiveSegment { start, end });
        self.next_start = end;

        tracing::debug!(
            id,
            start_ms = start.as_millis() as u64,
            dur_ms = segment.duration().as_millis() as u64,
            "Segment scheduled"
        );
        id
    }

    /// Barge-in: force-stop everything and reset the timeline.
    ///
    /// Idempotent; with nothing active this only resets `next_start`, so the
    /// next enqueued segment starts at the current clock.
    pub fn interrupt(&mut self) -> usize {
        self.reap();

        let stopped = self.active.len();
        for (id, _) in self.active.drain() {
            self.sink.stop(id);
        }
        self.next_start = Duration::ZERO;

        if stopped > 0 {
            tracing::info!(stopped, "Playback interrupted");
        }
        stopped
    }

    /// Remove naturally completed segments from the active set.
    /// Returns the ids that ended since the last call.
    pub fn reap(&mut self) -> Vec<SegmentId> {
        let ended = self.sink.drain_ended();
        for id in &ended {
            self.active.remove(id);
        }
        ended
    }

    /// State of a segment by id; `None` once it has reached a terminal state
    /// and left the active set.
    pub fn state_of(&self, id: SegmentId) -> Option<SegmentState> {
        let seg = self.active.get(&id)?;
        if self.sink.position() >= seg.start {
            Some(SegmentState::Playing)
        } else {
            Some(SegmentState::Scheduled)
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn next_start(&self) -> Duration {
        self.next_start
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
