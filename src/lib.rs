//! Emotion detection from three inputs: free text, a face picture and a
//! short voice recording.
//!
//! Each modality has an adapter that turns raw input into a label from the
//! shared [`Emotion`] vocabulary using pre-trained artifacts, and a
//! suggestion lookup that maps the label to advice. [`EmotionModels`] loads
//! every adapter once and is shared by the CLI and the web front end.

pub mod config;
pub mod emotion;
pub mod face;
pub mod model;
pub mod registry;
pub mod suggestion;
pub mod text;
pub mod voice;
pub mod web;

#[cfg(test)]
mod adapter_tests;

pub use config::Config;
pub use emotion::{Emotion, NO_FACE};
pub use face::{FaceEmotionAdapter, FaceOutcome};
pub use registry::{EmotionModels, Modality, ModelsError};
pub use suggestion::suggestion_for;
pub use text::TextEmotionAdapter;
pub use voice::VoiceEmotionAdapter;
