use thiserror::Error;

/// Library errors using thiserror for structured error handling.
///
/// Audio errors never reach UI callers of the session manager; they are
/// logged at the call site and turned into a `PlayOutcome` or dropped.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio resource: {asset}")]
    LoadFailed {
        asset: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Audio resource not found: {0}")]
    AssetMissing(String),

    #[error("Failed to decode audio format")]
    DecodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to initialize audio output stream")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Audio playback failed")]
    PlaybackFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to configure audio session: {0}")]
    SessionConfigFailed(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Network error while fetching levels: {0}")]
    Network(String),

    #[error("Level server returned status {0}")]
    Status(u16),

    #[error("Failed to parse level document")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to read level document: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Level not found: {0}")]
    LevelNotFound(String),

    #[error("Level {0} has no questions")]
    NoQuestions(String),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
