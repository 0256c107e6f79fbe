//! Face emotion CNN.
//!
//! Takes a `[1, 64, 64, 1]` float tensor and returns one score per class
//! in [`crate::emotion::Emotion::ALL`] order.

use super::FaceError;
use crate::model::ArtifactError;
use ndarray::Array4;
use std::path::Path;

#[cfg(feature = "onnx")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
#[cfg(feature = "onnx")]
use std::sync::Mutex;

/// Scores a preprocessed face crop
pub trait FaceModel: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, FaceError>;
}

#[cfg(feature = "onnx")]
pub struct OnnxFaceModel {
    session: Mutex<Session>,
}

#[cfg(feature = "onnx")]
impl OnnxFaceModel {
    pub fn new(model_path: &Path, n_threads: usize) -> Result<Self, ArtifactError> {
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

        tracing::info!("Face emotion model initialized with model: {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[cfg(feature = "onnx")]
impl FaceModel for OnnxFaceModel {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, FaceError> {
        let (batch, height, width, channels) = input.dim();
        let input_shape = [batch, height, width, channels];
        let data: Vec<f32> = input.iter().copied().collect();
        let input_tensor = Value::from_array((input_shape, data))
            .map_err(|e| FaceError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| FaceError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| FaceError::InferenceError(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| FaceError::InferenceError("No output from model".to_string()))?;

        let scores = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceError::InferenceError(e.to_string()))?;

        let values: Vec<f32> = scores.1.iter().copied().collect();
        Ok(values)
    }
}

// Stub implementation when feature is not enabled
#[cfg(not(feature = "onnx"))]
pub struct OnnxFaceModel;

#[cfg(not(feature = "onnx"))]
impl OnnxFaceModel {
    pub fn new(_model_path: &Path, _n_threads: usize) -> Result<Self, ArtifactError> {
        Err(ArtifactError::FeatureNotEnabled)
    }
}

#[cfg(not(feature = "onnx"))]
impl FaceModel for OnnxFaceModel {
    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, FaceError> {
        Err(FaceError::InferenceError(
            "ONNX support not compiled in".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "onnx")]
    #[test]
    fn test_model_not_found() {
        let result = OnnxFaceModel::new(Path::new("/nonexistent/emotion_model.onnx"), 1);
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_stub_model() {
        let result = OnnxFaceModel::new(Path::new("emotion_model.onnx"), 1);
        assert!(matches!(result, Err(ArtifactError::FeatureNotEnabled)));
    }
}
