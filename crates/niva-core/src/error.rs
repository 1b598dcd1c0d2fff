use thiserror::Error;

/// Top-level error type for Niva.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for NivaError` so that `?` works across crate
/// boundaries in the composition root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NivaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for NivaError {
    fn from(err: toml::de::Error) -> Self {
        NivaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NivaError {
    fn from(err: toml::ser::Error) -> Self {
        NivaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NivaError {
    fn from(err: serde_json::Error) -> Self {
        NivaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Niva operations.
pub type Result<T> = std::result::Result<T, NivaError>;
