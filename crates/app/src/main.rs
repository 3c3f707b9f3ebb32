use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use echovox_app::config::{AppConfig, Cli};
use echovox_app::session::SessionOrchestrator;
use echovox_app::transport::ToneTransport;
use echovox_audio::capture::CaptureThread;
use echovox_audio::pipeline::{CapturePipeline, PipelineConfig};
use echovox_audio::playback::PlaybackScheduler;
use echovox_audio::sink::PlaybackThread;
use echovox_foundation::{SessionState, StateManager};
use echovox_telemetry::PipelineMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load(Cli::parse())?;
    tracing::info!(model = %config.model_id, "Starting EchoVox");

    let state = StateManager::new();
    let metrics = Arc::new(PipelineMetrics::default());

    // Capture side: device thread -> pipeline -> broadcast frames
    let (block_tx, block_rx) = crossbeam_channel::bounded(64);
    let (capture, device_cfg) = CaptureThread::spawn(config.input_device.clone(), block_tx)?;
    tracing::info!(
        rate = device_cfg.sample_rate,
        channels = device_cfg.channels,
        "Capture device ready"
    );

    let (frame_tx, frame_rx) = tokio::sync::broadcast::channel(32);
    let pipeline = CapturePipeline::new(block_rx, frame_tx, PipelineConfig::default())
        .with_metrics(metrics.clone());
    let pipeline_handle = pipeline.spawn();

    // Playback side: mixing thread behind the scheduler
    let (playback, sink) = PlaybackThread::spawn(config.output_device.clone())?;
    let scheduler = PlaybackScheduler::new(sink);

    state.transition(SessionState::Connecting)?;
    let transport = ToneTransport::new();
    let orchestrator = SessionOrchestrator::new(
        transport,
        frame_rx,
        scheduler,
        config.model_id.clone(),
        metrics.clone(),
    );
    state.transition(SessionState::Streaming)?;

    let summary = tokio::select! {
        result = orchestrator.run() => Some(result?),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted by user");
            None
        }
    };

    state.transition(SessionState::Stopping)?;
    pipeline_handle.abort();
    capture.stop();
    playback.stop();
    state.transition(SessionState::Stopped)?;

    match summary {
        Some(summary) => tracing::info!(
            frames = summary.frames_streamed,
            segments = summary.segments_played,
            cost_usd = format!("{:.6}", summary.total_cost),
            "Session complete"
        ),
        None => tracing::info!(
            cost_usd = format!("{:.6}", metrics.session_cost_usd()),
            "Session aborted"
        ),
    }

    Ok(())
}
