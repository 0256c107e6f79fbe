//! Classifier exported to ONNX.
//!
//! Expects the skl2onnx layout: input `[1, n_features]` float32, first
//! output the predicted label (int64), second output the class
//! probabilities as a `[1, n_classes]` float tensor (export with
//! `zipmap=False`). Either output may be missing; the voice adapter falls
//! back from one to the other.

use super::{ArtifactError, ClassValue, Classifier, ClassifierError};
use std::path::Path;

#[cfg(feature = "onnx")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
#[cfg(feature = "onnx")]
use std::sync::Mutex;

/// ONNX-backed classifier over dense feature vectors
#[cfg(feature = "onnx")]
pub struct OnnxClassifier {
    session: Mutex<Session>,
    classes: Vec<ClassValue>,
}

#[cfg(feature = "onnx")]
impl OnnxClassifier {
    /// Load a classifier session
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `classes` - Class values in probability-output order
    /// * `n_threads` - Number of threads for inference
    pub fn new(
        model_path: &Path,
        classes: Vec<ClassValue>,
        n_threads: usize,
    ) -> Result<Self, ArtifactError> {
        if !model_path.exists() {
            return Err(ArtifactError::NotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ArtifactError::ModelLoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ArtifactError::ModelLoadError(e.to_string()))?
            .with_intra_threads(n_threads)
            .map_err(|e| ArtifactError::ModelLoadError(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| ArtifactError::ModelLoadError(e.to_string()))?;

        tracing::info!(
            "Loaded ONNX classifier from {:?} ({} classes)",
            model_path,
            classes.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            classes,
        })
    }

    fn input_tensor(features: &[f32]) -> Result<Value, ClassifierError> {
        let input_shape = [1_usize, features.len()];
        Value::from_array((input_shape, features.to_vec()))
            .map(|v| v.into_dyn())
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))
    }
}

#[cfg(feature = "onnx")]
impl Classifier<[f32]> for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<ClassValue, ClassifierError> {
        let input_tensor = Self::input_tensor(features)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| ClassifierError::InferenceError("No output from model".to_string()))?;

        let labels = output
            .1
            .try_extract_tensor::<i64>()
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))?;

        let label = labels
            .1
            .first()
            .copied()
            .ok_or_else(|| ClassifierError::InferenceError("Empty label output".to_string()))?;

        Ok(ClassValue::Index(label))
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        let input_tensor = Self::input_tensor(features)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))?;

        // Probabilities are the last output; single-output models export only them
        let output = outputs
            .iter()
            .last()
            .ok_or_else(|| ClassifierError::InferenceError("No output from model".to_string()))?;

        let proba = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceError(e.to_string()))?;

        let values: Vec<f32> = proba.1.iter().copied().collect();
        if values.len() != self.classes.len() {
            tracing::warn!(
                "Unexpected probability output size: {} (expected {})",
                values.len(),
                self.classes.len()
            );
        }

        Ok(values)
    }

    fn classes(&self) -> &[ClassValue] {
        &self.classes
    }
}

// Stub implementation when feature is not enabled
#[cfg(not(feature = "onnx"))]
pub struct OnnxClassifier {
    classes: Vec<ClassValue>,
}

#[cfg(not(feature = "onnx"))]
impl OnnxClassifier {
    pub fn new(
        _model_path: &Path,
        _classes: Vec<ClassValue>,
        _n_threads: usize,
    ) -> Result<Self, ArtifactError> {
        Err(ArtifactError::FeatureNotEnabled)
    }
}

#[cfg(not(feature = "onnx"))]
impl Classifier<[f32]> for OnnxClassifier {
    fn predict(&self, _features: &[f32]) -> Result<ClassValue, ClassifierError> {
        Err(ClassifierError::Unsupported("onnx"))
    }

    fn classes(&self) -> &[ClassValue] {
        &self.classes
    }
}
