//! Voice emotion adapter: mean MFCC vector of the clip's opening seconds
//! into a fitted classifier.
//!
//! The adapter never fails outward. Feature extraction problems answer
//! `neutral` without running the classifier; label decoding problems fall
//! back to the raw class value.

pub mod decode;
pub mod mfcc;
pub mod resampler;

pub use decode::{decode_file, DecodedAudio};
pub use mfcc::{MfccConfig, MfccExtractor};

use crate::config::{Config, VoiceSettings};
use crate::emotion::Emotion;
use crate::model::{
    argmax, ArtifactError, ClassValue, Classifier, ClassifierError, LabelEncoder, LinearModel,
    OnnxClassifier,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while turning an audio file into features
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Feature extraction failed: {0}")]
    Feature(String),
}

/// Audio preparation parameters
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Analysis sample rate; clips are resampled to it
    pub sample_rate: u32,
    /// Only this much of the clip's start is analyzed
    pub max_duration_secs: f64,
    pub n_mfcc: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            max_duration_secs: 3.0,
            n_mfcc: 40,
        }
    }
}

impl VoiceConfig {
    /// Sample budget of the analysis window
    pub fn max_samples(&self) -> usize {
        (self.max_duration_secs * self.sample_rate as f64).round() as usize
    }

    /// Samples of a clip at `source_rate` covering the analysis window
    pub fn max_source_samples(&self, source_rate: u32) -> usize {
        (self.max_duration_secs * source_rate as f64).ceil() as usize
    }

    pub fn mfcc_config(&self) -> MfccConfig {
        MfccConfig {
            sample_rate: self.sample_rate,
            n_mfcc: self.n_mfcc,
            ..MfccConfig::default()
        }
    }
}

impl From<&VoiceSettings> for VoiceConfig {
    fn from(settings: &VoiceSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            max_duration_secs: settings.max_duration_secs,
            n_mfcc: settings.n_mfcc,
        }
    }
}

pub struct VoiceEmotionAdapter {
    extractor: MfccExtractor,
    classifier: Box<dyn Classifier<[f32]>>,
    encoder: Option<Arc<LabelEncoder>>,
    config: VoiceConfig,
}

impl VoiceEmotionAdapter {
    pub fn new(
        classifier: Box<dyn Classifier<[f32]>>,
        encoder: Option<Arc<LabelEncoder>>,
        config: VoiceConfig,
    ) -> Result<Self, VoiceError> {
        let extractor = MfccExtractor::new(config.mfcc_config())?;
        Ok(Self {
            extractor,
            classifier,
            encoder,
            config,
        })
    }

    /// Load the classifier named in the config.
    ///
    /// An `.onnx` file loads as an ONNX session whose integer classes are
    /// taken from the label encoder; anything else is a linear model JSON.
    pub fn from_config(
        config: &Config,
        encoder: Option<Arc<LabelEncoder>>,
    ) -> Result<Self, ArtifactError> {
        let path = config.resolve(&config.voice.classifier);
        let is_onnx = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false);

        let classifier: Box<dyn Classifier<[f32]>> = if is_onnx {
            let classes = encoder
                .as_ref()
                .map(|e| e.index_classes())
                .unwrap_or_default();
            Box::new(OnnxClassifier::new(&path, classes, config.n_threads)?)
        } else {
            Box::new(LinearModel::from_file(&path)?)
        };

        Self::new(classifier, encoder, VoiceConfig::from(&config.voice)).map_err(|e| {
            ArtifactError::Invalid {
                path: path.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Mean MFCC vector over the first `max_duration_secs` of the clip
    pub fn extract_features(&self, path: &Path) -> Result<Vec<f32>, VoiceError> {
        let audio = decode_file(path)?;
        let head_len = audio
            .samples
            .len()
            .min(self.config.max_source_samples(audio.sample_rate));
        let mut samples = resampler::resample(
            &audio.samples[..head_len],
            audio.sample_rate,
            self.config.sample_rate,
        )?;
        samples.truncate(self.config.max_samples());

        debug!(
            "Voice clip {:?}: {:.2}s source, {} samples analyzed",
            path,
            audio.duration_secs(),
            samples.len()
        );

        self.extractor.compute_mean(&samples)
    }

    /// Predicted class, falling back to the most probable class when the
    /// classifier cannot predict directly
    pub fn classify(&self, features: &[f32]) -> Result<ClassValue, ClassifierError> {
        match self.classifier.predict(features) {
            Ok(class) => Ok(class),
            Err(e) => {
                debug!("Direct prediction unavailable ({}), using probabilities", e);
                let proba = self.classifier.predict_proba(features)?;
                let best = argmax(&proba).ok_or_else(|| {
                    ClassifierError::InferenceError("Empty probability vector".to_string())
                })?;
                self.classifier.classes().get(best).cloned().ok_or_else(|| {
                    ClassifierError::InferenceError(format!(
                        "Probability index {} outside {} classes",
                        best,
                        self.classifier.classes().len()
                    ))
                })
            }
        }
    }

    /// Decoded lowercase label; undecodable values are used verbatim
    fn label_for(&self, class: ClassValue) -> String {
        let label = match &self.encoder {
            Some(encoder) => match encoder.decode(&class) {
                Ok(label) => label,
                Err(e) => {
                    warn!("Label decoding failed ({}), using raw class {}", e, class);
                    class.to_string()
                }
            },
            None => class.to_string(),
        };
        label.to_lowercase()
    }

    /// Predict the emotion label for an audio file. Never fails.
    pub fn predict(&self, path: &Path) -> String {
        let features = match self.extract_features(path) {
            Ok(features) => features,
            Err(e) => {
                warn!("Voice feature extraction failed for {:?}: {}", path, e);
                return Emotion::Neutral.as_str().to_string();
            }
        };

        match self.classify(&features) {
            Ok(class) => self.label_for(class),
            Err(e) => {
                warn!("Voice prediction degraded to neutral: {}", e);
                Emotion::Neutral.as_str().to_string()
            }
        }
    }
}
