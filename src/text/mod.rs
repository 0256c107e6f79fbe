//! Text emotion adapter: TF-IDF features into a fitted classifier.
//!
//! The adapter never fails outward. [`TextEmotionAdapter::try_predict`]
//! reports the error category; [`TextEmotionAdapter::predict`] logs it and
//! answers `neutral`.

pub mod tfidf;

pub use tfidf::TfidfVectorizer;

use crate::config::Config;
use crate::emotion::Emotion;
use crate::model::label_encoder::DecodeError;
use crate::model::{
    ArtifactError, ClassValue, Classifier, ClassifierError, LabelEncoder, LinearModel, SparseVector,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while predicting from text
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Prediction failed: {0}")]
    Prediction(#[from] ClassifierError),

    #[error("Label decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Label outside the emotion vocabulary: {0}")]
    UnknownLabel(String),
}

pub struct TextEmotionAdapter {
    vectorizer: TfidfVectorizer,
    classifier: Box<dyn Classifier<SparseVector>>,
    encoder: Option<Arc<LabelEncoder>>,
}

impl TextEmotionAdapter {
    pub fn new(
        vectorizer: TfidfVectorizer,
        classifier: Box<dyn Classifier<SparseVector>>,
        encoder: Option<Arc<LabelEncoder>>,
    ) -> Self {
        Self {
            vectorizer,
            classifier,
            encoder,
        }
    }

    /// Load the vectorizer and classifier named in the config
    pub fn from_config(
        config: &Config,
        encoder: Option<Arc<LabelEncoder>>,
    ) -> Result<Self, ArtifactError> {
        let vectorizer = TfidfVectorizer::from_file(&config.resolve(&config.text.vectorizer))?;
        let classifier = LinearModel::from_file(&config.resolve(&config.text.classifier))?;
        Ok(Self::new(vectorizer, Box::new(classifier), encoder))
    }

    /// Predict the emotion label for free text.
    ///
    /// Blank input short-circuits to `neutral` without touching the model;
    /// every failure degrades to `neutral`.
    pub fn predict(&self, text: &str) -> Emotion {
        if text.trim().is_empty() {
            return Emotion::Neutral;
        }

        match self.try_predict(text) {
            Ok(emotion) => emotion,
            Err(e) => {
                warn!("Text emotion prediction degraded to neutral: {}", e);
                Emotion::Neutral
            }
        }
    }

    /// Predict, surfacing the failure category instead of degrading
    pub fn try_predict(&self, text: &str) -> Result<Emotion, TextError> {
        let processed = text.trim().to_lowercase();
        if processed.is_empty() {
            return Ok(Emotion::Neutral);
        }

        let features = self.vectorizer.transform(&processed);
        debug!(
            "Text features: {} non-zero of {}",
            features.nnz(),
            features.dim()
        );

        let class = self.classifier.predict(&features)?;
        let label = match (&self.encoder, class) {
            (Some(encoder), class) => encoder.decode(&class)?,
            (None, ClassValue::Name(name)) => name,
            (None, class) => class.to_string(),
        };

        let label = label.to_lowercase();
        label.parse().map_err(|_| TextError::UnknownLabel(label))
    }
}
