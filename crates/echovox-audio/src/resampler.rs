use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Streaming resampler for mono f32 capture audio.
///
/// - Maintains internal buffers to handle arbitrary-sized input chunks
/// - Uses Rubato's SincFixedIn for high-quality resampling
/// - Automatically handles buffering for Rubato's fixed chunk requirements
pub struct StreamResampler {
    in_rate: u32,
    out_rate: u32,
    resampler: SincFixedIn<f32>,
    /// Input buffer for accumulating samples
    input_buffer: Vec<f32>,
    /// Chunk size required by Rubato
    chunk_size: usize,
}

impl StreamResampler {
    /// Create a new mono resampler from in_rate -> out_rate.
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        // 1024 samples at 48kHz is ~21ms, small enough to keep the framing
        // stage fed at capture cadence
        let chunk_size = 1024;

        let sinc_params = SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 128,
            window: WindowFunction::Blackman2,
        };

        let resampler = SincFixedIn::<f32>::new(
            out_rate as f64 / in_rate as f64,
            2.0,
            sinc_params,
            chunk_size,
            1, // mono
        )
        .expect("Failed to create Rubato resampler");

        Self {
            in_rate,
            out_rate,
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        }
    }

    /// Process an arbitrary chunk of mono f32 samples.
    /// Returns a freshly allocated Vec resampled to out_rate.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.in_rate == self.out_rate {
            return input.to_vec();
        }

        self.input_buffer.extend_from_slice(input);

        let mut output = Vec::new();
        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            let input_frames = vec![chunk];

            match self.resampler.process(&input_frames, None) {
                Ok(frames) => {
                    if let Some(channel) = frames.into_iter().next() {
                        output.extend(channel);
                    }
                }
                Err(e) => {
                    tracing::error!("Resampler error: {}", e);
                    // Keep the stream alive; this chunk is lost
                }
            }
        }
        output
    }

    /// Reset internal state, clearing buffers and the resampler history.
    pub fn reset(&mut self) {
        self.input_buffer.clear();
        self.resampler.reset();
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}
