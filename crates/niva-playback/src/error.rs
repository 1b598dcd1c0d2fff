use niva_core::error::NivaError;
use niva_core::types::ClipTicket;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("unsupported clip: {0}")]
    Unsupported(String),

    #[error("failed to decode clip: {0}")]
    Decode(String),

    #[error("sink failed: {0}")]
    Sink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown {0}")]
    UnknownTicket(ClipTicket),

    #[error("{0} is not waiting for audio")]
    NotPending(ClipTicket),
}

impl From<PlaybackError> for NivaError {
    fn from(err: PlaybackError) -> Self {
        NivaError::Playback(err.to_string())
    }
}
