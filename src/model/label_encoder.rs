//! Class index → label name table (scikit-learn `LabelEncoder.classes_`).

use super::{load_json, ArtifactError, ClassValue};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Class index {index} out of range for {len} labels")]
    OutOfRange { index: i64, len: usize },

    #[error("Unknown class name: {0}")]
    UnknownName(String),
}

/// Ordered label table
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Load from a JSON artifact of the form `{"classes": [...]}`
    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let encoder: Self = load_json(path)?;
        if encoder.classes.is_empty() {
            return Err(ArtifactError::Invalid {
                path: path.to_path_buf(),
                message: "label encoder has no classes".to_string(),
            });
        }
        tracing::info!(
            "Loaded label encoder from {:?} ({} classes)",
            path,
            encoder.classes.len()
        );
        Ok(encoder)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Map a raw class value back to its label name.
    ///
    /// Indices are looked up in the table; names pass through only when the
    /// table knows them.
    pub fn decode(&self, value: &ClassValue) -> Result<String, DecodeError> {
        match value {
            ClassValue::Index(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| self.classes.get(i))
                .cloned()
                .ok_or(DecodeError::OutOfRange {
                    index: *index,
                    len: self.classes.len(),
                }),
            ClassValue::Name(name) => {
                if self.classes.iter().any(|c| c == name) {
                    Ok(name.clone())
                } else {
                    Err(DecodeError::UnknownName(name.clone()))
                }
            }
        }
    }

    /// Class values `0..len` as predicted by models trained on encoded targets
    pub fn index_classes(&self) -> Vec<ClassValue> {
        (0..self.classes.len() as i64).map(ClassValue::Index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> LabelEncoder {
        LabelEncoder::new(
            ["angry", "disgust", "fear", "happy", "neutral", "sad", "surprise"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    #[test]
    fn test_decode_index() {
        assert_eq!(encoder().decode(&ClassValue::Index(3)).unwrap(), "happy");
        assert_eq!(encoder().decode(&ClassValue::Index(0)).unwrap(), "angry");
    }

    #[test]
    fn test_decode_out_of_range() {
        assert_eq!(
            encoder().decode(&ClassValue::Index(7)),
            Err(DecodeError::OutOfRange { index: 7, len: 7 })
        );
        assert!(encoder().decode(&ClassValue::Index(-1)).is_err());
    }

    #[test]
    fn test_decode_name() {
        let enc = encoder();
        assert_eq!(enc.decode(&ClassValue::Name("sad".into())).unwrap(), "sad");
        assert_eq!(
            enc.decode(&ClassValue::Name("joy".into())),
            Err(DecodeError::UnknownName("joy".into()))
        );
    }

    #[test]
    fn test_index_classes() {
        let classes = encoder().index_classes();
        assert_eq!(classes.len(), 7);
        assert_eq!(classes[6], ClassValue::Index(6));
    }

    #[test]
    fn test_from_file_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_encoder.json");
        std::fs::write(&path, r#"{"classes": []}"#).unwrap();
        assert!(matches!(
            LabelEncoder::from_file(&path),
            Err(ArtifactError::Invalid { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_encoder.json");
        std::fs::write(&path, r#"{"classes": ["happy", "sad"]}"#).unwrap();
        let enc = LabelEncoder::from_file(&path).unwrap();
        assert_eq!(enc.len(), 2);
        assert_eq!(enc.classes()[1], "sad");
    }
}
