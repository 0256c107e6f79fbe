//! Request and response bodies for the HTTP API.

use crate::registry::PanelStatus;
use crate::suggestion::suggestion_for;
use serde::{Deserialize, Serialize};

pub const EMPTY_TEXT_MESSAGE: &str = "Please enter some text before analyzing.";
pub const NO_FACE_MESSAGE: &str = "No face detected. Please try again.";
pub const UNSUPPORTED_AUDIO_MESSAGE: &str = "Please upload a WAV or MP3 audio file to analyze.";

/// `POST /api/text` body
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Label plus the matching advice
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub label: String,
    pub suggestion: String,
}

impl PredictionResponse {
    /// Suggestions are keyed by the lowercase label
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let suggestion = suggestion_for(&label.to_lowercase()).to_string();
        Self { label, suggestion }
    }
}

/// `POST /api/face` result
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FaceResponse {
    Detected { label: String, suggestion: String },
    NoFace { message: String },
}

impl FaceResponse {
    pub fn detected(label: &str) -> Self {
        let PredictionResponse { label, suggestion } = PredictionResponse::new(label);
        FaceResponse::Detected { label, suggestion }
    }

    pub fn no_face() -> Self {
        FaceResponse::NoFace {
            message: NO_FACE_MESSAGE.to_string(),
        }
    }
}

/// `GET /health` result
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub panels: Vec<PanelStatus>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
