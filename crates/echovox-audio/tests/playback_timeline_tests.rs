//! Timeline behavior of the playback scheduler under realistic sequences of
//! response chunks, clock movement, and barge-in.

use echovox_audio::constants::PLAYBACK_SAMPLE_RATE;
use echovox_audio::playback::{DecodedSegment, PlaybackScheduler};
use echovox_audio::sink::ManualSink;
use std::time::Duration;

fn segment(duration_ms: u64) -> DecodedSegment {
    let samples = (PLAYBACK_SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
    DecodedSegment::new(vec![0.05; samples])
}

#[test]
fn streamed_turn_plays_back_to_back() {
    // A typical turn: chunks arrive faster than they play.
    let mut sched = PlaybackScheduler::new(ManualSink::new());

    for _ in 0..6 {
        sched.sink_mut().advance(Duration::from_millis(40));
        sched.enqueue(segment(200));
    }

    let log = sched.sink().scheduled_log();
    assert_eq!(log.len(), 6);
    // First chunk starts at its call-time clock, each later chunk exactly at
    // the previous end.
    assert_eq!(log[0].start, Duration::from_millis(40));
    for pair in log.windows(2) {
        assert_eq!(pair[1].start, pair[0].end);
    }
}

#[test]
fn slow_model_creates_gap_only_at_clock() {
    // When the model stalls longer than the buffered audio, the next chunk
    // anchors to the clock (the only kind of gap the scheduler allows).
    let mut sched = PlaybackScheduler::new(ManualSink::new());
    sched.enqueue(segment(100));
    sched.sink_mut().advance(Duration::from_millis(400));
    sched.enqueue(segment(100));

    let log = sched.sink().scheduled_log();
    assert_eq!(log[1].start, Duration::from_millis(400));
}

#[test]
fn barge_in_mid_turn_restarts_timeline_immediately() {
    let mut sched = PlaybackScheduler::new(ManualSink::new());
    for _ in 0..4 {
        sched.enqueue(segment(300));
    }
    sched.sink_mut().advance(Duration::from_millis(450));

    // User starts talking; the server's interruption flag arrives.
    let stopped = sched.interrupt();
    // Segment 0 ended at 300ms; 1 is playing, 2 and 3 are scheduled.
    assert_eq!(stopped, 3);
    assert_eq!(sched.active_count(), 0);

    // The next turn's first chunk must not wait for the dead timeline.
    sched.enqueue(segment(150));
    let entry = sched.sink().scheduled_log().last().copied().unwrap();
    assert_eq!(entry.start, Duration::from_millis(450));
    assert_eq!(sched.next_start(), Duration::from_millis(600));
}

#[test]
fn repeated_interruptions_are_safe() {
    let mut sched = PlaybackScheduler::new(ManualSink::new());
    for round in 0..3 {
        sched.enqueue(segment(500));
        sched.sink_mut().advance(Duration::from_millis(100));
        sched.interrupt();
        sched.interrupt(); // double-fire, must be a no-op
        assert_eq!(sched.active_count(), 0, "round {round}");
        assert_eq!(sched.next_start(), Duration::ZERO, "round {round}");
    }
}

#[test]
fn completed_segments_retire_without_disturbing_following_ones() {
    let mut sched = PlaybackScheduler::new(ManualSink::new());
    let first = sched.enqueue(segment(100));
    let second = sched.enqueue(segment(400));

    sched.sink_mut().advance(Duration::from_millis(150));
    let ended = sched.reap();
    assert_eq!(ended, vec![first]);

    // Second segment still live and scheduled where it always was.
    assert_eq!(sched.active_count(), 1);
    assert!(sched.state_of(second).is_some());
    assert_eq!(sched.next_start(), Duration::from_millis(500));
}

#[test]
fn enqueue_prunes_finished_segments() {
    let mut sched = PlaybackScheduler::new(ManualSink::new());
    sched.enqueue(segment(50));
    sched.sink_mut().advance(Duration::from_millis(80));

    // enqueue reaps internally; the finished segment leaves the active set
    // without an explicit reap call.
    sched.enqueue(segment(50));
    assert_eq!(sched.active_count(), 1);
}
