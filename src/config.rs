use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Remote document listing the quiz levels
pub const DEFAULT_LEVELS_URL: &str =
    "https://gist.githubusercontent.com/Oscar-skr/407c4db8d978c1817abfaf9f3f37b709/raw/quiz.json";

/// User-facing sound preferences, persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundPrefs {
    /// Background music muted
    pub music_muted: bool,

    /// Sound effects muted
    pub effects_muted: bool,

    /// Baseline background music volume (0.0-1.0)
    pub background_volume: f32,

    /// Baseline sound effect volume (0.0-1.0)
    pub effects_volume: f32,
}

impl Default for SoundPrefs {
    fn default() -> Self {
        Self {
            music_muted: false,
            effects_muted: false,
            background_volume: 0.08,
            effects_volume: 0.8,
        }
    }
}

impl SoundPrefs {
    /// Clamp both volumes into [0, 1]. Non-finite values fall back to defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.background_volume = clamp_or(self.background_volume, defaults.background_volume);
        self.effects_volume = clamp_or(self.effects_volume, defaults.effects_volume);
        self
    }
}

fn clamp_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Timing and level constants for ducking and preloading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundTuning {
    /// Fraction of the baseline background volume used while ducked
    pub duck_factor: f32,

    /// Delay before a duck is released, in milliseconds
    pub duck_restore_ms: u64,

    /// Delay before effect preloading starts, in milliseconds
    pub preload_delay_ms: u64,
}

impl Default for SoundTuning {
    fn default() -> Self {
        Self {
            duck_factor: 0.12,
            duck_restore_ms: 600,
            preload_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub prefs: SoundPrefs,
    pub tuning: SoundTuning,

    /// Directory holding the background track and effect files
    pub assets_dir: PathBuf,

    /// URL of the level document
    pub levels_url: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            prefs: SoundPrefs::default(),
            tuning: SoundTuning::default(),
            assets_dir: PathBuf::from("assets/audio"),
            levels_url: DEFAULT_LEVELS_URL.to_string(),
        }
    }
}

impl SoundConfig {
    /// Load configuration from the platform-specific config directory.
    /// Creates default config if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, writing defaults if missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = SoundConfig::default();
            config.save_to(path)?;
            tracing::info!("Created default config at: {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let mut config: SoundConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        config.validate()?;
        config.prefs = config.prefs.sanitized();

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        write_json(path, self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.tuning.duck_factor) {
            return Err(ConfigError::Invalid(format!(
                "duck_factor must be within [0, 1], got {}",
                self.tuning.duck_factor
            )));
        }
        if self.levels_url.trim().is_empty() {
            return Err(ConfigError::Invalid("levels_url is empty".to_string()));
        }
        Ok(())
    }

    /// Get the config directory (user config folder)
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("TriviaQuiz"))
            .unwrap_or_else(|| PathBuf::from("config"))
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }
}

/// Persists [`SoundPrefs`] whenever a mute flag or volume changes
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store next to the config file
    pub fn default_location() -> Self {
        Self::new(SoundConfig::config_dir().join("sound_prefs.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read stored preferences, `None` if nothing was saved yet
    pub fn load(&self) -> Result<Option<SoundPrefs>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| ConfigError::LoadFailed {
            path: self.path.display().to_string(),
            source: Box::new(e),
        })?;
        let prefs: SoundPrefs =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: self.path.display().to_string(),
                source: Box::new(e),
            })?;
        Ok(Some(prefs.sanitized()))
    }

    pub fn save(&self, prefs: &SoundPrefs) -> Result<(), ConfigError> {
        write_json(&self.path, prefs)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| ConfigError::SaveFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;
    fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SoundConfig::default();
        assert_eq!(config.prefs.background_volume, 0.08);
        assert_eq!(config.prefs.effects_volume, 0.8);
        assert!(!config.prefs.music_muted);
        assert!(!config.prefs.effects_muted);
        assert_eq!(config.tuning.duck_restore_ms, 600);
        assert_eq!(config.tuning.duck_factor, 0.12);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = SoundConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.levels_url, DEFAULT_LEVELS_URL);
    }

    #[test]
    fn test_partial_file_uses_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "prefs": { "effects_volume": 3.5, "music_muted": true } }"#).unwrap();

        let config = SoundConfig::load_from(&path).unwrap();
        assert!(config.prefs.music_muted);
        assert_eq!(config.prefs.effects_volume, 1.0);
        assert_eq!(config.prefs.background_volume, 0.08);
        assert_eq!(config.tuning.duck_restore_ms, 600);
    }

    #[test]
    fn test_invalid_duck_factor_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "tuning": { "duck_factor": 1.7 } }"#).unwrap();

        let err = SoundConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_prefs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("prefs.json"));
        assert!(store.load().unwrap().is_none());

        let prefs = SoundPrefs {
            music_muted: true,
            effects_volume: 0.3,
            ..SoundPrefs::default()
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), Some(prefs));
    }
}
