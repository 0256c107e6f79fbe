//! HTTP handlers for the three analysis panels.
//!
//! Inference is CPU-bound, so every prediction runs on tokio's blocking
//! pool; the async side only parses requests and shapes responses.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use std::io::Write;
use tracing::{debug, warn};

use super::page::INDEX_HTML;
use super::server::AppState;
use super::types::{
    ErrorResponse, FaceResponse, HealthResponse, PredictionResponse, TextRequest,
    EMPTY_TEXT_MESSAGE, UNSUPPORTED_AUDIO_MESSAGE,
};
use crate::face::{FaceError, FaceOutcome};
use crate::registry::ModelsError;

/// Error answered as `{ "error": message }` with the given status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ModelsError> for ApiError {
    fn from(e: ModelsError) -> Self {
        let status = match &e {
            ModelsError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ModelsError::Face(FaceError::Decode(_)) => StatusCode::BAD_REQUEST,
            ModelsError::Face(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::new(e.status(), e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("Request failed ({}): {}", self.status, self.message);
        } else {
            debug!("Request rejected ({}): {}", self.status, self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Run a blocking closure on the blocking pool
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("Inference task failed: {}", e)))
}

/// One uploaded multipart file
struct Upload {
    file_name: Option<String>,
    data: Bytes,
}

async fn read_upload(multipart: &mut Multipart, field_name: &str) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(Upload { file_name, data });
    }
    Err(ApiError::bad_request(format!(
        "Missing multipart field '{}'",
        field_name
    )))
}

/// Temp file suffix for an accepted audio upload name
pub fn audio_suffix(file_name: &str) -> Option<&'static str> {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".wav") {
        Some(".wav")
    } else if lower.ends_with(".mp3") {
        Some(".mp3")
    } else {
        None
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let panels = state.models.status();
    Json(HealthResponse {
        healthy: panels.iter().all(|p| p.ready),
        panels,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn analyze_text(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request(EMPTY_TEXT_MESSAGE));
    }
    state.models.text()?;

    let models = state.models.clone();
    let label = run_blocking(move || models.predict_text_emotion(&req.text)).await??;
    debug!("Text panel: {}", label);

    Ok(Json(PredictionResponse::new(label)))
}

pub async fn analyze_face(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FaceResponse>, ApiError> {
    state.models.face()?;
    let upload = read_upload(&mut multipart, "image").await?;

    let models = state.models.clone();
    let outcome = run_blocking(move || models.analyze_face(&upload.data)).await??;
    debug!("Face panel: {}", outcome.label());

    Ok(Json(match outcome {
        FaceOutcome::NoFace => FaceResponse::no_face(),
        detected => FaceResponse::detected(detected.label()),
    }))
}

pub async fn analyze_voice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    state.models.voice()?;
    let upload = read_upload(&mut multipart, "audio").await?;
    let suffix = upload
        .file_name
        .as_deref()
        .and_then(audio_suffix)
        .ok_or_else(|| ApiError::bad_request(UNSUPPORTED_AUDIO_MESSAGE))?;

    let models = state.models.clone();
    let upload_dir = state.upload_dir.clone();
    let label = run_blocking(move || -> Result<String, ApiError> {
        // Removed when `file` drops, on every path out of this closure
        let mut file = tempfile::Builder::new()
            .prefix("emotion-voice-")
            .suffix(suffix)
            .tempfile_in(&upload_dir)
            .map_err(|e| ApiError::internal(format!("Failed to create temp file: {}", e)))?;
        file.write_all(&upload.data)
            .and_then(|_| file.flush())
            .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;

        Ok(models.predict_voice_emotion(file.path())?)
    })
    .await??;
    debug!("Voice panel: {}", label);

    Ok(Json(PredictionResponse::new(label)))
}
