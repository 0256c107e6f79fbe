use super::VoiceError;
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

/// Whole-buffer resampler for decoded clips
pub struct AudioResampler {
    resampler: FftFixedIn<f32>,
    output_buffer: Vec<Vec<f32>>,
    ratio: f64,
}

impl AudioResampler {
    /// Create a mono resampler between two sample rates
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self, VoiceError> {
        let ratio = to_rate as f64 / from_rate as f64;

        debug!(
            "Creating resampler: {} Hz -> {} Hz (ratio: {:.4})",
            from_rate, to_rate, ratio
        );

        let resampler = FftFixedIn::new(
            from_rate as usize,
            to_rate as usize,
            1024,
            2, // sub_chunks for quality
            1,
        )
        .map_err(|e| VoiceError::Resample(e.to_string()))?;

        let output_buffer = resampler.output_buffer_allocate(true);

        Ok(Self {
            resampler,
            output_buffer,
            ratio,
        })
    }

    /// Resample a complete clip.
    ///
    /// The filter delay is trimmed from the front and the tail is flushed, so
    /// the output holds `ceil(len * ratio)` samples aligned with the input.
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>, VoiceError> {
        let expected = (input.len() as f64 * self.ratio).ceil() as usize;
        let delay = self.resampler.output_delay();
        let mut output = Vec::with_capacity(expected + delay);

        let mut pos = 0;
        while input.len() - pos >= self.resampler.input_frames_next() {
            let n = self.resampler.input_frames_next();
            let chunk: [&[f32]; 1] = [&input[pos..pos + n]];
            let (_, written) = self
                .resampler
                .process_into_buffer(&chunk[..], &mut self.output_buffer, None)
                .map_err(|e| VoiceError::Resample(e.to_string()))?;
            output.extend_from_slice(&self.output_buffer[0][..written]);
            pos += n;
        }

        if pos < input.len() {
            let tail: [&[f32]; 1] = [&input[pos..]];
            let (_, written) = self
                .resampler
                .process_partial_into_buffer(Some(&tail[..]), &mut self.output_buffer, None)
                .map_err(|e| VoiceError::Resample(e.to_string()))?;
            output.extend_from_slice(&self.output_buffer[0][..written]);
        }

        // Flush the filter until the delayed tail is out
        while output.len() < delay + expected {
            let (_, written) = self
                .resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut self.output_buffer, None)
                .map_err(|e| VoiceError::Resample(e.to_string()))?;
            if written == 0 {
                break;
            }
            output.extend_from_slice(&self.output_buffer[0][..written]);
        }

        let end = (delay + expected).min(output.len());
        Ok(output[delay.min(end)..end].to_vec())
    }
}

/// Convert a mono clip to `to_rate`, passing it through when rates match
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, VoiceError> {
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    AudioResampler::new(from_rate, to_rate)?.process_all(input)
}
