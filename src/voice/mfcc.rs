//! MFCC features compatible with librosa's defaults.
//!
//! Pipeline: centered zero-padded frames → periodic Hann window → power
//! spectrum → Slaney mel filterbank → dB (80 dB floor below the peak) →
//! orthonormal DCT-II. The per-frame coefficients are averaged into one
//! vector per clip.

use super::VoiceError;
use ndarray::{Array1, Array2, Axis};
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

/// Parameters for MFCC extraction
#[derive(Debug, Clone)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub fmin: f64,
    /// Upper mel edge; `None` means Nyquist
    pub fmax: Option<f64>,
    /// Dynamic range kept below the loudest bin, in dB
    pub top_db: f32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 40,
            fmin: 0.0,
            fmax: None,
            top_db: 80.0,
        }
    }
}

/// Floor applied before taking the log of a power value
const AMIN: f32 = 1e-10;

/// MFCC extractor with a pre-computed filterbank, DCT basis and FFT plan
pub struct MfccExtractor {
    config: MfccConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    mel_filterbank: Array2<f32>,
    dct: Array2<f32>,
}

impl MfccExtractor {
    pub fn new(config: MfccConfig) -> Result<Self, VoiceError> {
        if config.n_fft == 0 || config.hop_length == 0 {
            return Err(VoiceError::Feature(
                "n_fft and hop_length must be positive".to_string(),
            ));
        }
        if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
            return Err(VoiceError::Feature(format!(
                "n_mfcc must be in 1..={}, got {}",
                config.n_mels, config.n_mfcc
            )));
        }

        // Periodic Hann window
        let window: Vec<f32> = (0..config.n_fft)
            .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / config.n_fft as f64).cos()) as f32)
            .collect();

        let fmax = config.fmax.unwrap_or(config.sample_rate as f64 / 2.0);
        let mel_filterbank = create_mel_filterbank(
            config.n_mels,
            config.n_fft,
            config.sample_rate as f64,
            config.fmin,
            fmax,
        );
        let dct = create_dct_basis(config.n_mfcc, config.n_mels);

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Ok(Self {
            config,
            fft,
            window,
            mel_filterbank,
            dct,
        })
    }

    /// Number of frames produced for `len` samples
    pub fn n_frames(&self, len: usize) -> usize {
        1 + len / self.config.hop_length
    }

    /// Power spectrogram, shape `(n_fft / 2 + 1, frames)`
    fn power_spectrogram(&self, audio: &[f32]) -> Result<Array2<f32>, VoiceError> {
        let n_fft = self.config.n_fft;
        let pad = n_fft / 2;
        let n_frames = self.n_frames(audio.len());
        let n_bins = n_fft / 2 + 1;

        let mut power = Array2::<f32>::zeros((n_bins, n_frames));
        let mut fft_input = self.fft.make_input_vec();
        let mut fft_output = self.fft.make_output_vec();

        for frame_idx in 0..n_frames {
            // Frame start in padded coordinates; zeros outside the signal
            let start = (frame_idx * self.config.hop_length) as isize - pad as isize;
            for (i, slot) in fft_input.iter_mut().enumerate() {
                let src = start + i as isize;
                let sample = if src >= 0 && (src as usize) < audio.len() {
                    audio[src as usize]
                } else {
                    0.0
                };
                *slot = sample * self.window[i];
            }

            self.fft
                .process(&mut fft_input, &mut fft_output)
                .map_err(|e| VoiceError::Feature(format!("FFT failed: {}", e)))?;

            for (bin, c) in fft_output.iter().enumerate() {
                power[[bin, frame_idx]] = c.re * c.re + c.im * c.im;
            }
        }

        Ok(power)
    }

    /// Per-frame MFCCs, shape `(n_mfcc, frames)`
    pub fn compute_frames(&self, audio: &[f32]) -> Result<Array2<f32>, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }

        let power = self.power_spectrogram(audio)?;
        let mel = self.mel_filterbank.dot(&power);
        let log_mel = power_to_db(&mel, self.config.top_db);
        Ok(self.dct.dot(&log_mel))
    }

    /// Frame-averaged MFCC vector of length `n_mfcc`
    pub fn compute_mean(&self, audio: &[f32]) -> Result<Vec<f32>, VoiceError> {
        let frames = self.compute_frames(audio)?;
        let mean: Array1<f32> = frames
            .mean_axis(Axis(1))
            .ok_or_else(|| VoiceError::Feature("No frames to average".to_string()))?;
        Ok(mean.to_vec())
    }
}

/// Convert power to decibels, clipping at `top_db` below the peak
fn power_to_db(spec: &Array2<f32>, top_db: f32) -> Array2<f32> {
    let db = spec.mapv(|p| 10.0 * p.max(AMIN).log10());
    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - top_db;
    db.mapv(|v| v.max(floor))
}

/// Slaney-style mel scale: linear below 1 kHz, logarithmic above
fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;
    let logstep = (6.4f64).ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;
    let logstep = (6.4f64).ln() / 27.0;

    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters with Slaney area normalization.
///
/// # Returns
/// Matrix of shape `(n_mels, n_fft / 2 + 1)`
fn create_mel_filterbank(
    n_mels: usize,
    n_fft: usize,
    sample_rate: f64,
    fmin: f64,
    fmax: f64,
) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let hz_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filterbank = Array2::<f32>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        let enorm = 2.0 / (right - left);

        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            let weight = lower.min(upper).max(0.0);
            filterbank[[m, k]] = (weight * enorm) as f32;
        }
    }

    filterbank
}

/// Orthonormal DCT-II basis, shape `(n_out, n_in)`
fn create_dct_basis(n_out: usize, n_in: usize) -> Array2<f32> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        };
        (scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()) as f32
    })
}
