use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,

    /// Base directory for relative artifact paths
    pub models_dir: PathBuf,

    /// Label encoder shared by the text and voice classifiers
    pub label_encoder: PathBuf,

    pub text: TextArtifacts,
    pub face: FaceSettings,
    pub voice: VoiceSettings,
    pub server: ServerSettings,

    /// Threads per ONNX session
    pub n_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            models_dir: PathBuf::from("models"),
            label_encoder: PathBuf::from("label_encoder.json"),
            text: TextArtifacts::default(),
            face: FaceSettings::default(),
            voice: VoiceSettings::default(),
            server: ServerSettings::default(),
            n_threads: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextArtifacts {
    pub vectorizer: PathBuf,
    pub classifier: PathBuf,
}

impl Default for TextArtifacts {
    fn default() -> Self {
        Self {
            vectorizer: PathBuf::from("text_vectorizer.json"),
            classifier: PathBuf::from("text_model.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceSettings {
    pub model: PathBuf,
    pub cascade: PathBuf,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub input_size: u32,
    pub min_face_size: u32,
}

impl Default for FaceSettings {
    fn default() -> Self {
        Self {
            model: PathBuf::from("emotion_model.onnx"),
            cascade: PathBuf::from("haarcascade_frontalface_default.xml"),
            scale_factor: 1.3,
            min_neighbors: 5,
            input_size: 64,
            min_face_size: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// `.onnx` loads an ONNX session, anything else a linear model JSON
    pub classifier: PathBuf,
    pub sample_rate: u32,
    pub max_duration_secs: f64,
    pub n_mfcc: usize,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            classifier: PathBuf::from("voice_model.onnx"),
            sample_rate: 22050,
            max_duration_secs: 3.0,
            n_mfcc: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".emotion-insight"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Resolve an artifact path against `models_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.models_dir.join(path)
        }
    }

    /// Reject settings the pipelines cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.face.scale_factor <= 1.0 {
            bail!(
                "face.scale_factor must be greater than 1.0, got {}",
                self.face.scale_factor
            );
        }
        if self.face.input_size == 0 {
            bail!("face.input_size must be positive");
        }
        if self.voice.sample_rate == 0 {
            bail!("voice.sample_rate must be positive");
        }
        if self.voice.max_duration_secs <= 0.0 {
            bail!(
                "voice.max_duration_secs must be positive, got {}",
                self.voice.max_duration_secs
            );
        }
        if self.voice.n_mfcc == 0 || self.voice.n_mfcc > 128 {
            bail!("voice.n_mfcc must be in 1..=128, got {}", self.voice.n_mfcc);
        }
        if self.server.max_upload_bytes == 0 {
            bail!("server.max_upload_bytes must be positive");
        }
        if self.n_threads == 0 {
            bail!("n_threads must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.face.min_neighbors, 5);
        assert_eq!(config.voice.n_mfcc, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.models_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.models_dir = PathBuf::from("/opt/emotion/models");
        config.server.port = 9000;
        config.voice.classifier = PathBuf::from("voice_model.json");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.models_dir, PathBuf::from("/opt/emotion/models"));
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.voice.classifier, PathBuf::from("voice_model.json"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 8080}, "face": {"min_neighbors": 3}}"#)
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.face.min_neighbors, 3);
        assert_eq!(config.face.scale_factor, 1.3);
    }

    #[test]
    fn test_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ port: }").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_resolve() {
        let config = Config {
            models_dir: PathBuf::from("/srv/models"),
            ..Config::default()
        };
        assert_eq!(
            config.resolve(Path::new("text_model.json")),
            PathBuf::from("/srv/models/text_model.json")
        );
        assert_eq!(
            config.resolve(Path::new("/elsewhere/cascade.xml")),
            PathBuf::from("/elsewhere/cascade.xml")
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.face.scale_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.voice.n_mfcc = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.n_threads = 0;
        assert!(config.validate().is_err());
    }
}
