pub mod capture;
pub mod codec;
pub mod constants;
pub mod framer;
pub mod pipeline;
pub mod playback;
pub mod resampler;
pub mod sink;

// Public API
pub use capture::{CaptureStats, CaptureThread, DeviceConfig, RawBlock};
pub use framer::{AppendResult, CaptureFrame, Framer};
pub use pipeline::{CapturePipeline, PipelineConfig};
pub use playback::{AudioSink, DecodedSegment, PlaybackScheduler, SegmentId, SegmentState};
pub use resampler::StreamResampler;
pub use sink::{CpalSink, ManualSink};
