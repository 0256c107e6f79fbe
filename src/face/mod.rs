//! Face emotion adapter: Haar cascade detection followed by a CNN over the
//! selected face crop.
//!
//! Unlike the text and voice adapters, an undecodable image is surfaced as
//! an error. A picture without a face is a normal outcome
//! ([`FaceOutcome::NoFace`]), rendered as the `no_face` sentinel.

pub mod cascade;
pub mod detect;
pub mod model;
pub mod preprocess;

pub use cascade::{CascadeError, HaarCascade};
pub use detect::FaceRegion;
pub use model::{FaceModel, OnnxFaceModel};

use crate::config::{Config, FaceSettings};
use crate::emotion::{Emotion, NO_FACE};
use crate::model::{argmax, ArtifactError};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during face emotion detection
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Class index {index} outside the {len} known emotions")]
    LabelIndex { index: usize, len: usize },
}

/// Detection and preprocessing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Pyramid shrink factor between scan levels
    pub scale_factor: f64,
    /// A grouped detection needs more than this many raw hits
    pub min_neighbors: u32,
    /// Side length of the square classifier input
    pub input_size: u32,
    /// Smallest face side in pixels to look for (0 = cascade window size)
    pub min_face_size: u32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.3,
            min_neighbors: 5,
            input_size: 64,
            min_face_size: 0,
        }
    }
}

impl From<&FaceSettings> for FaceConfig {
    fn from(settings: &FaceSettings) -> Self {
        Self {
            scale_factor: settings.scale_factor,
            min_neighbors: settings.min_neighbors,
            input_size: settings.input_size,
            min_face_size: settings.min_face_size,
        }
    }
}

/// Result of analyzing one picture
#[derive(Debug, Clone, PartialEq)]
pub enum FaceOutcome {
    Detected {
        emotion: Emotion,
        region: FaceRegion,
        scores: Vec<f32>,
    },
    NoFace,
}

impl FaceOutcome {
    /// Capitalized emotion name, or the `no_face` sentinel
    pub fn label(&self) -> &'static str {
        match self {
            FaceOutcome::Detected { emotion, .. } => emotion.display_name(),
            FaceOutcome::NoFace => NO_FACE,
        }
    }
}

/// Largest region wins; ties go to the top-most, then left-most
pub fn select_face(regions: &[FaceRegion]) -> Option<FaceRegion> {
    regions.iter().copied().max_by(|a, b| {
        a.area()
            .cmp(&b.area())
            .then(b.y.cmp(&a.y))
            .then(b.x.cmp(&a.x))
    })
}

pub struct FaceEmotionAdapter {
    cascade: HaarCascade,
    model: Box<dyn FaceModel>,
    config: FaceConfig,
}

impl FaceEmotionAdapter {
    pub fn new(cascade: HaarCascade, model: Box<dyn FaceModel>, config: FaceConfig) -> Self {
        Self {
            cascade,
            model,
            config,
        }
    }

    /// Load the cascade and CNN named in the config
    pub fn from_config(config: &Config) -> Result<Self, ArtifactError> {
        let cascade = HaarCascade::from_file(&config.resolve(&config.face.cascade))?;
        let model = OnnxFaceModel::new(&config.resolve(&config.face.model), config.n_threads)?;
        Ok(Self::new(
            cascade,
            Box::new(model),
            FaceConfig::from(&config.face),
        ))
    }

    /// Face regions found in a grayscale picture, in detector order
    pub fn detect_faces(&self, gray: &GrayImage) -> Vec<FaceRegion> {
        detect::detect_multi_scale(&self.cascade, gray, &self.config)
    }

    /// Classify the emotion of the most prominent face in a grayscale picture
    pub fn analyze(&self, gray: &GrayImage) -> Result<FaceOutcome, FaceError> {
        let regions = self.detect_faces(gray);
        let region = match select_face(&regions) {
            Some(region) => region,
            None => {
                tracing::debug!("No face detected in {}x{} image", gray.width(), gray.height());
                return Ok(FaceOutcome::NoFace);
            }
        };

        let input = preprocess::face_tensor(gray, &region, self.config.input_size);
        let scores = self.model.predict(&input)?;

        let index = argmax(&scores)
            .ok_or_else(|| FaceError::InferenceError("Empty score vector".to_string()))?;
        let emotion = Emotion::from_index(index).ok_or(FaceError::LabelIndex {
            index,
            len: Emotion::ALL.len(),
        })?;

        tracing::debug!(
            "Face {:?} of {} candidates classified as {}",
            region,
            regions.len(),
            emotion
        );

        Ok(FaceOutcome::Detected {
            emotion,
            region,
            scores,
        })
    }

    /// Decode an encoded picture (JPEG, PNG) and analyze it
    pub fn detect_from_bytes(&self, bytes: &[u8]) -> Result<FaceOutcome, FaceError> {
        let image = image::load_from_memory(bytes)?;
        let gray = preprocess::to_grayscale(&image);
        self.analyze(&gray)
    }
}
