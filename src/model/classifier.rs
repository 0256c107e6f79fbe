//! Classifier seam shared by the text and voice adapters.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by a classifier at prediction time
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Feature dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Operation not supported by this model: {0}")]
    Unsupported(&'static str),
}

/// Raw class value produced by a classifier.
///
/// Models trained on encoded targets predict an index that still has to go
/// through a [`LabelEncoder`](super::LabelEncoder); models trained on string
/// targets predict the name directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassValue {
    Index(i64),
    Name(String),
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A fitted classifier over feature vectors of type `X`
pub trait Classifier<X: ?Sized>: Send + Sync {
    /// Predict the class for a single feature vector
    fn predict(&self, features: &X) -> Result<ClassValue, ClassifierError>;

    /// Class probabilities, index-aligned with [`Classifier::classes`]
    fn predict_proba(&self, _features: &X) -> Result<Vec<f32>, ClassifierError> {
        Err(ClassifierError::Unsupported("predict_proba"))
    }

    /// Classes known to the model, in output order
    fn classes(&self) -> &[ClassValue];
}
