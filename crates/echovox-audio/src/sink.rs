//! Audio sink implementations: the real cpal output mixer and a
//! deterministic manual-time sink for tests and headless operation.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::PLAYBACK_SAMPLE_RATE;
use crate::playback::{AudioSink, DecodedSegment, SegmentId};
use echovox_foundation::AudioError;

struct MixEntry {
    id: SegmentId,
    samples: Arc<[f32]>,
    start_frame: u64,
}

struct Mixer {
    frames_written: u64,
    entries: Vec<MixEntry>,
}

/// Control-side handle to the playback mixer. Sendable; the cpal stream
/// itself lives on the playback thread.
pub struct CpalSink {
    shared: Arc<Mutex<Mixer>>,
    ended_rx: Receiver<SegmentId>,
    sample_rate: u32,
}

impl AudioSink for CpalSink {
    fn position(&self) -> Duration {
        let frames = self.shared.lock().frames_written;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn schedule(&mut self, id: SegmentId, segment: &DecodedSegment, start: Duration) {
        let start_frame = (start.as_secs_f64() * self.sample_rate as f64).round() as u64;
        self.shared.lock().entries.push(MixEntry {
            id,
            samples: Arc::clone(&segment.samples),
            start_frame,
        });
    }

    fn stop(&mut self, id: SegmentId) {
        self.shared.lock().entries.retain(|e| e.id != id);
    }

    fn drain_ended(&mut self) -> Vec<SegmentId> {
        self.ended_rx.try_iter().collect()
    }
}

/// A handle to the dedicated playback thread owning the cpal output stream.
pub struct PlaybackThread {
    pub handle: JoinHandle<()>,
    pub shutdown: Arc<AtomicBool>,
}

impl PlaybackThread {
    /// Open the output device at the fixed playback rate and start mixing.
    pub fn spawn(device_name: Option<String>) -> Result<(Self, CpalSink), AudioError> {
        let shared = Arc::new(Mutex::new(Mixer {
            frames_written: 0,
            entries: Vec::new(),
        }));
        let (ended_tx, ended_rx) = crossbeam_channel::unbounded();
        let (startup_tx, startup_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);

        let running = Arc::new(AtomicBool::new(true));
        let shutdown = running.clone();
        let shared_clone = shared.clone();

        let handle = thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || {
                let stream = match build_output_stream(device_name.as_deref(), shared_clone, ended_tx)
                {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = startup_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = startup_tx.send(Err(e.into()));
                    return;
                }
                let _ = startup_tx.send(Ok(()));

                // The stream runs from its callback; this thread just keeps
                // it alive until shutdown.
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(100));
                }
                drop(stream);
                tracing::info!("Audio playback thread shutting down");
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn playback thread: {}", e)))?;

        match startup_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(AudioError::Fatal(
                    "Playback stream did not start within timeout".to_string(),
                ))
            }
        }

        Ok((
            Self { handle, shutdown },
            CpalSink {
                shared,
                ended_rx,
                sample_rate: PLAYBACK_SAMPLE_RATE,
            },
        ))
    }

    pub fn stop(self) {
        self.shutdown.store(false, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

fn build_output_stream(
    device_name: Option<&str>,
    shared: Arc<Mutex<Mixer>>,
    ended_tx: Sender<SegmentId>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .output_devices()
            .map_err(|e| AudioError::Fatal(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound {
                name: Some(name.to_string()),
            })?,
        None => host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound { name: None })?,
    };
    if let Ok(n) = device.name() {
        tracing::info!("Selected output device: {}", n);
    }

    let default_config = device
        .default_output_config()
        .map_err(|e| AudioError::Fatal(e.to_string()))?;
    if default_config.sample_format() != SampleFormat::F32 {
        return Err(AudioError::FormatNotSupported {
            format: format!("{:?}", default_config.sample_format()),
        });
    }

    // Response audio is fixed-rate; ask the host to run the stream at it.
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: SampleRate(PLAYBACK_SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };
    let channels = config.channels as usize;

    let err_fn = |err: cpal::StreamError| {
        tracing::error!("Playback stream error: {}", err);
    };

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &_| {
            let mut guard = shared.lock();
            let mixer = &mut *guard;
            let base = mixer.frames_written;
            let frames = data.len() / channels;

            for fi in 0..frames {
                let abs = base + fi as u64;
                let mut acc = 0.0f32;
                for entry in &mixer.entries {
                    if abs >= entry.start_frame {
                        let idx = (abs - entry.start_frame) as usize;
                        if idx < entry.samples.len() {
                            acc += entry.samples[idx];
                        }
                    }
                }
                let sample = acc.clamp(-1.0, 1.0);
                for ch in 0..channels {
                    data[fi * channels + ch] = sample;
                }
            }

            mixer.frames_written += frames as u64;
            let cutoff = mixer.frames_written;
            mixer.entries.retain(|e| {
                let end = e.start_frame + e.samples.len() as u64;
                if end <= cutoff {
                    let _ = ended_tx.send(e.id);
                    false
                } else {
                    true
                }
            });
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Deterministic sink with a manually advanced clock.
///
/// Used by scheduler tests and headless sessions: `advance` moves the clock
/// and retires segments whose end has passed.
#[derive(Debug, Default)]
pub struct ManualSink {
    position: Duration,
    scheduled: Vec<ScheduledEntry>,
    active: Vec<(SegmentId, Duration)>,
    stopped: Vec<SegmentId>,
    ended: Vec<SegmentId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEntry {
    pub id: SegmentId,
    pub start: Duration,
    pub end: Duration,
}

impl ManualSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&mut self, position: Duration) {
        self.position = position;
        self.retire_passed();
    }

    pub fn advance(&mut self, delta: Duration) {
        self.position += delta;
        self.retire_passed();
    }

    /// Every schedule call observed, in order.
    pub fn scheduled_log(&self) -> &[ScheduledEntry] {
        &self.scheduled
    }

    pub fn stopped_log(&self) -> &[SegmentId] {
        &self.stopped
    }

    fn retire_passed(&mut self) {
        let position = self.position;
        let ended = &mut self.ended;
        self.active.retain(|&(id, end)| {
            if end <= position {
                ended.push(id);
                false
            } else {
                true
            }
        });
    }
}

impl AudioSink for ManualSink {
    fn position(&self) -> Duration {
        self.position
    }

    fn schedule(&mut self, id: SegmentId, segment: &DecodedSegment, start: Duration) {
        let end = start + segment.duration();
        self.scheduled.push(ScheduledEntry { id, start, end });
        self.active.push((id, end));
    }

    fn stop(&mut self, id: SegmentId) {
        self.active.retain(|&(active_id, _)| active_id != id);
        self.stopped.push(id);
    }

    fn drain_ended(&mut self) -> Vec<SegmentId> {
        std::mem::take(&mut self.ended)
    }
}
