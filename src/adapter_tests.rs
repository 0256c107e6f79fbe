//! Behavior of the three adapters as seen through [`crate::registry::EmotionModels`].

use crate::emotion::{Emotion, NO_FACE};
use crate::suggestion::{suggestion_for, DEFAULT_SUGGESTION};
use proptest::prelude::*;

/// Small in-memory models shared by the router and adapter tests
pub(crate) mod fixtures {
    use crate::face::cascade::tests::single_stage_cascade;
    use crate::face::{FaceConfig, FaceEmotionAdapter, FaceError, FaceModel, HaarCascade};
    use crate::model::linear::ProbabilityKind;
    use crate::model::{ClassValue, LabelEncoder, LinearModel};
    use crate::registry::EmotionModels;
    use crate::text::tfidf::TfidfArtifact;
    use crate::text::{TextEmotionAdapter, TfidfVectorizer};
    use crate::voice::{VoiceConfig, VoiceEmotionAdapter};
    use image::{GrayImage, ImageFormat, Luma};
    use ndarray::Array4;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Arc;

    /// Always answers the same scores
    pub struct FixedFaceModel(pub Vec<f32>);

    impl FaceModel for FixedFaceModel {
        fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, FaceError> {
            Ok(self.0.clone())
        }
    }

    pub fn encoder() -> Arc<LabelEncoder> {
        Arc::new(LabelEncoder::new(vec!["happy".to_string(), "sad".to_string()]))
    }

    /// "sunny" leans happy, "gloomy" leans sad
    pub fn text_adapter() -> TextEmotionAdapter {
        let artifact: TfidfArtifact = serde_json::from_value(serde_json::json!({
            "vocabulary": { "sunny": 0, "gloomy": 1 },
            "idf": [1.0, 1.0]
        }))
        .unwrap();
        let classifier = LinearModel::new(
            vec![vec![-1.0, 1.0]],
            vec![0.0],
            vec![ClassValue::Index(0), ClassValue::Index(1)],
            ProbabilityKind::Softmax,
        )
        .unwrap();

        TextEmotionAdapter::new(
            TfidfVectorizer::from_artifact(artifact).unwrap(),
            Box::new(classifier),
            Some(encoder()),
        )
    }

    /// Accepts every textured 24x24 window; scores favor Happy
    pub fn face_adapter() -> FaceEmotionAdapter {
        FaceEmotionAdapter::new(
            HaarCascade::from_xml(&single_stage_cascade(-1.0)).unwrap(),
            Box::new(FixedFaceModel(vec![0.0, 0.1, 0.0, 0.8, 0.05, 0.05, 0.0])),
            FaceConfig::default(),
        )
    }

    /// Linear model whose positive intercept always picks "sad"
    pub fn voice_adapter() -> VoiceEmotionAdapter {
        let classifier = LinearModel::new(
            vec![vec![0.0; 40]],
            vec![1.0],
            vec![ClassValue::Index(0), ClassValue::Index(1)],
            ProbabilityKind::Softmax,
        )
        .unwrap();
        VoiceEmotionAdapter::new(Box::new(classifier), Some(encoder()), VoiceConfig::default())
            .unwrap()
    }

    pub fn ready_models() -> EmotionModels {
        EmotionModels::from_adapters(text_adapter(), face_adapter(), voice_adapter())
    }

    pub fn textured_face(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]))
    }

    pub fn png_bytes(image: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    pub fn tone(sample_rate: u32, seconds: f32, freq: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin() * 0.4
            })
            .collect()
    }

    fn wav_spec(sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buf, wav_spec(sample_rate)).unwrap();
            for s in samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        buf.into_inner()
    }

    pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
        std::fs::write(path, wav_bytes(samples, sample_rate)).unwrap();
    }
}

use fixtures::*;

#[test]
fn test_blank_text_is_neutral() {
    let models = ready_models();
    for text in ["", " ", "\t\n "] {
        assert_eq!(models.predict_text_emotion(text).unwrap(), "neutral");
    }
}

#[test]
fn test_text_label_follows_model() {
    let models = ready_models();
    assert_eq!(models.predict_text_emotion("SUNNY afternoon").unwrap(), "happy");
    assert_eq!(models.predict_text_emotion("gloomy, so gloomy").unwrap(), "sad");
}

#[test]
fn test_face_without_face_is_sentinel() {
    let models = ready_models();
    let flat = image::GrayImage::from_pixel(64, 64, image::Luma([90]));
    let label = models
        .detect_face_emotion_from_bytes(&png_bytes(&flat))
        .unwrap();
    assert_eq!(label, NO_FACE);
}

#[test]
fn test_face_label_is_capitalized_emotion() {
    let models = ready_models();
    let label = models
        .detect_face_emotion_from_bytes(&png_bytes(&textured_face(48, 48)))
        .unwrap();
    assert_eq!(label, "Happy");
    assert!(Emotion::ALL.iter().any(|e| e.display_name() == label));
}

#[test]
fn test_face_rejects_non_image_bytes() {
    let models = ready_models();
    assert!(models
        .detect_face_emotion_from_bytes(b"GIF? no, just text")
        .is_err());
}

#[test]
fn test_voice_analyzes_only_first_three_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let mut long = tone(22050, 3.0, 220.0);
    long.extend(tone(22050, 2.0, 880.0));
    let head = &long[..66150];

    let long_path = dir.path().join("long.wav");
    let head_path = dir.path().join("head.wav");
    write_wav(&long_path, &long, 22050);
    write_wav(&head_path, head, 22050);

    let adapter = voice_adapter();
    let long_features = adapter.extract_features(&long_path).unwrap();
    let head_features = adapter.extract_features(&head_path).unwrap();

    assert_eq!(long_features.len(), 40);
    for (a, b) in long_features.iter().zip(&head_features) {
        assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
    }
}

#[test]
fn test_voice_window_holds_for_44k_sources() {
    let dir = tempfile::tempdir().unwrap();
    let mut long = tone(44100, 3.0, 220.0);
    long.extend(tone(44100, 2.0, 880.0));
    let head = &long[..132300];

    let long_path = dir.path().join("long_44k.wav");
    let head_path = dir.path().join("head_44k.wav");
    write_wav(&long_path, &long, 44100);
    write_wav(&head_path, head, 44100);

    let adapter = voice_adapter();
    let long_features = adapter.extract_features(&long_path).unwrap();
    let head_features = adapter.extract_features(&head_path).unwrap();

    for (a, b) in long_features.iter().zip(&head_features) {
        assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
    }
}

#[test]
fn test_voice_short_clip_is_not_padded() {
    let dir = tempfile::tempdir().unwrap();
    let clip = tone(22050, 1.0, 440.0);
    let mut padded = clip.clone();
    padded.extend(std::iter::repeat(0.0).take(44100));

    let clip_path = dir.path().join("clip.wav");
    let padded_path = dir.path().join("padded.wav");
    write_wav(&clip_path, &clip, 22050);
    write_wav(&padded_path, &padded, 22050);

    let adapter = voice_adapter();
    let clip_features = adapter.extract_features(&clip_path).unwrap();
    let padded_features = adapter.extract_features(&padded_path).unwrap();

    let diff: f32 = clip_features
        .iter()
        .zip(&padded_features)
        .map(|(a, b)| (a - b).abs())
        .sum();
    assert!(diff > 1.0);
}

#[test]
fn test_voice_corrupt_audio_is_neutral() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.mp3");
    std::fs::write(&path, b"ID3 but nothing else").unwrap();

    let models = ready_models();
    assert_eq!(models.predict_voice_emotion(&path).unwrap(), "neutral");
}

#[test]
fn test_every_emotion_has_its_own_suggestion() {
    for emotion in Emotion::ALL {
        assert_ne!(suggestion_for(emotion.as_str()), DEFAULT_SUGGESTION);
        assert_eq!(
            suggestion_for(&emotion.display_name().to_lowercase()),
            suggestion_for(emotion.as_str())
        );
    }
    assert_eq!(suggestion_for(NO_FACE), DEFAULT_SUGGESTION);
}

#[test]
fn test_predictions_are_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_wav(&path, &tone(16000, 1.5, 300.0), 16000);
    let png = png_bytes(&textured_face(48, 48));

    let models = ready_models();
    assert_eq!(
        models.predict_text_emotion("sunny").unwrap(),
        models.predict_text_emotion("sunny").unwrap()
    );
    assert_eq!(
        models.detect_face_emotion_from_bytes(&png).unwrap(),
        models.detect_face_emotion_from_bytes(&png).unwrap()
    );
    assert_eq!(
        models.predict_voice_emotion(&path).unwrap(),
        models.predict_voice_emotion(&path).unwrap()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_text_label_is_lowercase_vocabulary(text in "\\PC{0,40}") {
        let label = text_adapter().predict(&text);
        prop_assert!(Emotion::ALL.contains(&label));
        let name = label.as_str();
        prop_assert_eq!(name.to_lowercase(), name);
    }

    #[test]
    fn prop_face_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        match face_adapter().detect_from_bytes(&bytes) {
            Ok(outcome) => {
                let label = outcome.label();
                prop_assert!(label == NO_FACE || Emotion::ALL.iter().any(|e| e.display_name() == label));
            }
            Err(_) => {}
        }
    }
}
