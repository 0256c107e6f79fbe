//! Pre-trained classifier artifacts.
//!
//! Every artifact is loaded once at startup and is read-only afterwards:
//! - [`LabelEncoder`]: class index → label name table
//! - [`LinearModel`]: linear classifier exported as JSON
//! - [`OnnxClassifier`]: classifier exported to ONNX (e.g. by skl2onnx)
//!
//! Adapters talk to classifiers through the [`Classifier`] trait so the
//! concrete artifact format can be swapped without touching them.

pub mod classifier;
pub mod label_encoder;
pub mod linear;
pub mod onnx;
pub mod sparse;

pub use classifier::{ClassValue, Classifier, ClassifierError};
pub use label_encoder::LabelEncoder;
pub use linear::LinearModel;
pub use onnx::OnnxClassifier;
pub use sparse::SparseVector;

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid artifact {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Feature not enabled: ONNX models require the 'onnx' feature")]
    FeatureNotEnabled,
}

/// Read and deserialize a JSON artifact
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Index of the largest score; the first one wins on ties.
///
/// Returns `None` for an empty slice or when every score is NaN.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins_on_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[3.0]), Some(0));
    }

    #[test]
    fn test_argmax_negative_scores() {
        assert_eq!(argmax(&[-5.0, -1.0, -3.0]), Some(1));
    }

    #[test]
    fn test_argmax_empty_and_nan() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, f32::NAN]), None);
        assert_eq!(argmax(&[f32::NAN, 0.5]), Some(1));
    }

    #[test]
    fn test_load_json_missing_file() {
        let result: Result<LabelEncoder, _> = load_json(Path::new("/nonexistent/encoder.json"));
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_load_json_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result: Result<LabelEncoder, _> = load_json(&path);
        assert!(matches!(result, Err(ArtifactError::Parse { .. })));
    }
}
