//! Error types for the conversation engine.

use niva_core::error::NivaError;
use niva_core::types::{ClipTicket, Mode};
use niva_gateway::BackendError;
use niva_playback::PlaybackError;
use niva_voice::VoiceError;

/// Errors returned to callers of the session API.
///
/// Backend failures during a turn never show up here: they are turned into
/// a fallback assistant turn and a notification.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("{0} mode is not available")]
    ModeUnavailable(Mode),
    #[error("voice error: {0}")]
    Voice(#[from] VoiceError),
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),
}

impl From<ChatError> for NivaError {
    fn from(err: ChatError) -> Self {
        NivaError::Chat(err.to_string())
    }
}

/// Tone adaptation failed; the unadapted text is kept.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tone adaptation failed: {0}")]
pub struct ToneAdaptError(#[source] pub BackendError);

/// Speech synthesis for a narrated turn failed; its clip slot is dropped.
#[derive(Debug, Clone, thiserror::Error)]
#[error("speech synthesis for {ticket} failed: {source}")]
pub struct SynthesisError {
    pub ticket: ClipTicket,
    #[source]
    pub source: BackendError,
}
