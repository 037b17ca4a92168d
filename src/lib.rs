//! Sound session and quiz flow for the trivia quiz app.

pub mod audio_system;
pub mod config;
pub mod error;
pub mod quiz;

pub use audio_system::{AudioSessionManager, EffectName, PlayOptions, PlayOutcome};
pub use config::{PrefsStore, SoundConfig, SoundPrefs, SoundTuning};
pub use error::{AppResult, AudioError, ConfigError, QuizError};
