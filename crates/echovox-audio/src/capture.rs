use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use echovox_foundation::AudioError;

/// One host-sized block of capture audio, in the device's native rate and
/// channel layout. The pipeline stage downmixes and resamples.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub blocks_captured: AtomicU64,
    pub blocks_dropped: AtomicU64,
    pub stream_errors: AtomicU64,
}

/// A handle to the dedicated audio-capture thread.
pub struct CaptureThread {
    pub handle: JoinHandle<()>,
    pub shutdown: Arc<AtomicBool>,
    pub stats: Arc<CaptureStats>,
}

impl CaptureThread {
    /// Spawn the capture thread and block until the device is producing a
    /// known configuration (or a timeout elapses).
    pub fn spawn(
        device_name: Option<String>,
        block_tx: Sender<RawBlock>,
    ) -> Result<(Self, DeviceConfig), AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = running.clone();
        let stats = Arc::new(CaptureStats::default());
        let stats_clone = stats.clone();
        let device_config = Arc::new(RwLock::new(None::<DeviceConfig>));
        let device_config_clone = device_config.clone();

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let mut capture = AudioCapture::new(block_tx, stats_clone, running.clone());

                // Try the requested device first, then let the host decide.
                let mut attempts: Vec<Option<String>> = Vec::new();
                if let Some(d) = device_name {
                    attempts.push(Some(d));
                }
                attempts.push(None);

                let mut dev_cfg = None;
                for attempt in attempts {
                    match capture.start(attempt.as_deref()) {
                        Ok(cfg) => {
                            tracing::info!("Audio capture started on device: {:?}", attempt);
                            dev_cfg = Some(cfg);
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Failed to start capture on {:?}: {}", attempt, e);
                        }
                    }
                }
                let Some(dev_cfg) = dev_cfg else {
                    tracing::error!("No capture device could be opened");
                    return;
                };
                *device_config_clone.write() = Some(dev_cfg);

                // Stream errors flag a restart; retry on the default device.
                while running.load(Ordering::Relaxed) {
                    if capture.restart_needed.load(Ordering::SeqCst) {
                        tracing::warn!("Capture restart triggered by stream error");
                        capture.stop();
                        capture.restart_needed.store(false, Ordering::SeqCst);
                        match capture.start(None) {
                            Ok(cfg) => {
                                tracing::info!("Capture restarted");
                                *device_config_clone.write() = Some(cfg);
                            }
                            Err(e) => {
                                tracing::error!("Failed to restart capture: {}", e);
                                thread::sleep(Duration::from_secs(1));
                            }
                        }
                    }
                    thread::sleep(Duration::from_millis(100));
                }

                tracing::info!("Audio capture thread shutting down");
                capture.stop();
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn audio thread: {}", e)))?;

        // Wait for the thread to report a device configuration
        let start = Instant::now();
        let mut cfg = None;
        while start.elapsed() < Duration::from_secs(3) {
            if let Some(config) = *device_config.read() {
                cfg = Some(config);
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }

        let cfg = cfg.ok_or_else(|| {
            AudioError::Fatal("Failed to get device configuration within timeout".to_string())
        })?;

        Ok((
            Self {
                handle,
                shutdown,
                stats,
            },
            cfg,
        ))
    }

    pub fn stop(self) {
        self.shutdown.store(false, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

struct AudioCapture {
    stream: Option<Stream>,
    block_tx: Sender<RawBlock>,
    stats: Arc<CaptureStats>,
    running: Arc<AtomicBool>,
    restart_needed: Arc<AtomicBool>,
}

impl AudioCapture {
    fn new(
        block_tx: Sender<RawBlock>,
        stats: Arc<CaptureStats>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            stream: None,
            block_tx,
            stats,
            running,
            restart_needed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start(&mut self, device_name: Option<&str>) -> Result<DeviceConfig, AudioError> {
        let device = open_device(device_name)?;
        if let Ok(n) = device.name() {
            tracing::info!("Selected input device: {}", n);
        }
        let (config, sample_format) = negotiate_config(&device)?;

        let device_config = DeviceConfig {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };

        let stream = self.build_stream(device, config, sample_format)?;
        stream.play()?;
        self.stream = Some(stream);
        Ok(device_config)
    }

    fn build_stream(
        &mut self,
        device: cpal::Device,
        config: StreamConfig,
        sample_format: SampleFormat,
    ) -> Result<Stream, AudioError> {
        let block_tx = self.block_tx.clone();
        let stats = Arc::clone(&self.stats);
        let running = Arc::clone(&self.running);
        let restart_needed = Arc::clone(&self.restart_needed);
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        let err_fn = {
            let stats = Arc::clone(&stats);
            move |err: cpal::StreamError| {
                tracing::error!("Audio stream error: {}", err);
                stats.stream_errors.fetch_add(1, Ordering::Relaxed);
                restart_needed.store(true, Ordering::SeqCst);
            }
        };

        // Common handler once converted to f32
        let handle_f32 = move |data: &[f32]| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            let block = RawBlock {
                samples: data.to_vec(),
                sample_rate,
                channels,
                timestamp: Instant::now(),
            };
            match block_tx.try_send(block) {
                Ok(()) => {
                    stats.blocks_captured.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    stats.blocks_dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &_| {
                    handle_f32(data);
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &_| {
                    let converted: Vec<f32> =
                        data.iter().map(|&s| s as f32 / 32768.0).collect();
                    handle_f32(&converted);
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &_| {
                    // Center unsigned [0,65535] before scaling
                    let converted: Vec<f32> = data
                        .iter()
                        .map(|&s| (s as i32 - 32768) as f32 / 32768.0)
                        .collect();
                    handle_f32(&converted);
                },
                err_fn,
                None,
            )?,
            other => {
                return Err(AudioError::FormatNotSupported {
                    format: format!("{:?}", other),
                });
            }
        };

        Ok(stream)
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }
}

fn open_device(device_name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => {
            let mut devices = host.input_devices().map_err(|e| AudioError::Fatal(e.to_string()))?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: Some(name.to_string()),
                })
        }
        None => host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound { name: None }),
    }
}

fn negotiate_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), AudioError> {
    // Try the default config first
    if let Ok(default_config) = device.default_input_config() {
        return Ok((
            StreamConfig {
                channels: default_config.channels(),
                sample_rate: default_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            default_config.sample_format(),
        ));
    }

    // Fallback to first available config
    if let Ok(configs) = device.supported_input_configs() {
        if let Some(config) = configs.into_iter().next() {
            return Ok((config.with_max_sample_rate().into(), config.sample_format()));
        }
    }

    Err(AudioError::FormatNotSupported {
        format: "No supported audio formats".to_string(),
    })
}
