//! Process-wide model state.
//!
//! Every modality is loaded once at startup. A panel is either ready and
//! owns its adapter, or unavailable and remembers why; there is no
//! half-initialized state in between.

use crate::config::Config;
use crate::face::{FaceEmotionAdapter, FaceError, FaceOutcome};
use crate::model::LabelEncoder;
use crate::text::TextEmotionAdapter;
use crate::voice::VoiceEmotionAdapter;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Face,
    Voice,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Face => "face",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ModelsError {
    #[error("{modality} analysis is unavailable: {reason}")]
    Unavailable { modality: Modality, reason: String },

    #[error(transparent)]
    Face(#[from] FaceError),
}

/// Load state of one modality
pub enum Panel<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Panel<T> {
    fn from_result<E: fmt::Display>(modality: Modality, result: Result<T, E>) -> Self {
        match result {
            Ok(adapter) => {
                info!("{} models ready", modality);
                Panel::Ready(adapter)
            }
            Err(e) => {
                error!("Failed to load {} models: {}", modality, e);
                Panel::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Panel::Ready(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Panel::Ready(_) => None,
            Panel::Unavailable(reason) => Some(reason),
        }
    }

    fn get(&self, modality: Modality) -> Result<&T, ModelsError> {
        match self {
            Panel::Ready(adapter) => Ok(adapter),
            Panel::Unavailable(reason) => Err(ModelsError::Unavailable {
                modality,
                reason: reason.clone(),
            }),
        }
    }
}

/// Availability of one panel, as reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct PanelStatus {
    pub modality: Modality,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Loaded adapters for every modality
pub struct EmotionModels {
    text: Panel<TextEmotionAdapter>,
    face: Panel<FaceEmotionAdapter>,
    voice: Panel<VoiceEmotionAdapter>,
}

impl EmotionModels {
    pub fn new(
        text: Panel<TextEmotionAdapter>,
        face: Panel<FaceEmotionAdapter>,
        voice: Panel<VoiceEmotionAdapter>,
    ) -> Self {
        Self { text, face, voice }
    }

    /// All three panels ready
    pub fn from_adapters(
        text: TextEmotionAdapter,
        face: FaceEmotionAdapter,
        voice: VoiceEmotionAdapter,
    ) -> Self {
        Self::new(Panel::Ready(text), Panel::Ready(face), Panel::Ready(voice))
    }

    /// Load every modality from the configured artifacts.
    ///
    /// Never fails as a whole; callers decide with
    /// [`EmotionModels::ensure_all_ready`] whether a missing panel is fatal.
    pub fn load(config: &Config) -> Self {
        info!("Loading models from {:?}", config.models_dir);

        let encoder_path = config.resolve(&config.label_encoder);
        let encoder = LabelEncoder::from_file(&encoder_path)
            .map(Arc::new)
            .map_err(|e| format!("label encoder: {}", e));

        let text = Panel::from_result(
            Modality::Text,
            encoder.clone().and_then(|encoder| {
                TextEmotionAdapter::from_config(config, Some(encoder)).map_err(|e| e.to_string())
            }),
        );

        let face = Panel::from_result(Modality::Face, FaceEmotionAdapter::from_config(config));

        let voice = Panel::from_result(
            Modality::Voice,
            encoder.and_then(|encoder| {
                VoiceEmotionAdapter::from_config(config, Some(encoder)).map_err(|e| e.to_string())
            }),
        );

        Self::new(text, face, voice)
    }

    /// Fail with the first unavailable panel
    pub fn ensure_all_ready(&self) -> Result<(), ModelsError> {
        self.text.get(Modality::Text)?;
        self.face.get(Modality::Face)?;
        self.voice.get(Modality::Voice)?;
        Ok(())
    }

    pub fn status(&self) -> Vec<PanelStatus> {
        let entry = |modality, ready, error: Option<&str>| PanelStatus {
            modality,
            ready,
            error: error.map(str::to_string),
        };
        vec![
            entry(Modality::Text, self.text.is_ready(), self.text.error()),
            entry(Modality::Face, self.face.is_ready(), self.face.error()),
            entry(Modality::Voice, self.voice.is_ready(), self.voice.error()),
        ]
    }

    pub fn text(&self) -> Result<&TextEmotionAdapter, ModelsError> {
        self.text.get(Modality::Text)
    }

    pub fn face(&self) -> Result<&FaceEmotionAdapter, ModelsError> {
        self.face.get(Modality::Face)
    }

    pub fn voice(&self) -> Result<&VoiceEmotionAdapter, ModelsError> {
        self.voice.get(Modality::Voice)
    }

    /// Lowercase emotion label for free text
    pub fn predict_text_emotion(&self, text: &str) -> Result<String, ModelsError> {
        Ok(self.text()?.predict(text).as_str().to_string())
    }

    /// Face outcome for an encoded picture
    pub fn analyze_face(&self, bytes: &[u8]) -> Result<FaceOutcome, ModelsError> {
        Ok(self.face()?.detect_from_bytes(bytes)?)
    }

    /// Capitalized emotion label, or `no_face`
    pub fn detect_face_emotion_from_bytes(&self, bytes: &[u8]) -> Result<String, ModelsError> {
        Ok(self.analyze_face(bytes)?.label().to_string())
    }

    /// Lowercase label for an audio file
    pub fn predict_voice_emotion(&self, path: &Path) -> Result<String, ModelsError> {
        Ok(self.voice()?.predict(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_text_artifacts(dir: &Path) {
        std::fs::write(
            dir.join("label_encoder.json"),
            r#"{"classes": ["happy", "sad"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("text_vectorizer.json"),
            r#"{"vocabulary": {"sunny": 0, "gloomy": 1}, "idf": [1.0, 1.0]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("text_model.json"),
            r#"{"coef": [[-1.0, 1.0]], "intercept": [0.0], "classes": [0, 1]}"#,
        )
        .unwrap();
    }

    fn config_for(dir: &Path) -> Config {
        Config {
            models_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_load_empty_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        let models = EmotionModels::load(&config_for(dir.path()));

        assert!(models.ensure_all_ready().is_err());
        let status = models.status();
        assert_eq!(status.len(), 3);
        assert!(status.iter().all(|s| !s.ready && s.error.is_some()));
        assert!(status[0].error.as_deref().unwrap().contains("label encoder"));
    }

    #[test]
    fn test_partial_load_serves_text_only() {
        let dir = tempfile::tempdir().unwrap();
        write_text_artifacts(dir.path());
        let models = EmotionModels::load(&config_for(dir.path()));

        let status = models.status();
        assert!(status[0].ready);
        assert!(!status[1].ready);
        assert!(!status[2].ready);

        assert_eq!(models.predict_text_emotion("gloomy gloomy day").unwrap(), "sad");
        assert_eq!(models.predict_text_emotion("what a sunny day").unwrap(), "happy");
        assert_eq!(models.predict_text_emotion("   ").unwrap(), "neutral");

        match models.predict_voice_emotion(&PathBuf::from("clip.wav")) {
            Err(ModelsError::Unavailable { modality, .. }) => assert_eq!(modality, Modality::Voice),
            other => panic!("expected unavailable voice panel, got {:?}", other),
        }
        assert!(matches!(
            models.detect_face_emotion_from_bytes(&[]),
            Err(ModelsError::Unavailable {
                modality: Modality::Face,
                ..
            })
        ));
    }

    #[test]
    fn test_status_serializes_without_null_errors() {
        let models = EmotionModels::new(
            Panel::Unavailable("missing".to_string()),
            Panel::Unavailable("missing".to_string()),
            Panel::Unavailable("missing".to_string()),
        );
        let json = serde_json::to_value(models.status()).unwrap();
        assert_eq!(json[0]["modality"], "text");
        assert_eq!(json[0]["error"], "missing");
    }
}
