use niva_core::error::NivaError;
use niva_core::types::VoiceSessionState;

/// A failure reported by (or while talking to) the speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("speech recognition is not supported on this platform")]
    Unsupported,
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognition aborted")]
    Aborted,
    #[error("audio capture failed")]
    AudioCapture,
    #[error("network error during recognition")]
    Network,
    #[error("language not supported")]
    LanguageNotSupported,
    #[error("recognition failed: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Map a recognizer error code (`not-allowed`, `no-speech`, ...) to an error.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "service-not-allowed" => RecognitionError::PermissionDenied,
            "no-speech" => RecognitionError::NoSpeech,
            "aborted" => RecognitionError::Aborted,
            "audio-capture" => RecognitionError::AudioCapture,
            "network" => RecognitionError::Network,
            "language-not-supported" => RecognitionError::LanguageNotSupported,
            other => RecognitionError::Other(other.to_string()),
        }
    }

    /// The code this error is reported under.
    pub fn code(&self) -> &str {
        match self {
            RecognitionError::PermissionDenied => "not-allowed",
            RecognitionError::Unsupported => "unsupported",
            RecognitionError::NoSpeech => "no-speech",
            RecognitionError::Aborted => "aborted",
            RecognitionError::AudioCapture => "audio-capture",
            RecognitionError::Network => "network",
            RecognitionError::LanguageNotSupported => "language-not-supported",
            RecognitionError::Other(code) => code,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, RecognitionError::PermissionDenied)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Invalid voice state transition: {from} -> {to}")]
    InvalidTransition {
        from: VoiceSessionState,
        to: VoiceSessionState,
    },
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

impl From<VoiceError> for NivaError {
    fn from(err: VoiceError) -> Self {
        NivaError::Voice(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_permission_variants() {
        assert!(RecognitionError::from_code("not-allowed").is_permission_denied());
        assert!(RecognitionError::from_code("service-not-allowed").is_permission_denied());
        assert!(!RecognitionError::from_code("network").is_permission_denied());
    }

    #[test]
    fn test_from_code_known_and_unknown() {
        assert_eq!(
            RecognitionError::from_code("no-speech"),
            RecognitionError::NoSpeech
        );
        assert_eq!(
            RecognitionError::from_code("audio-capture"),
            RecognitionError::AudioCapture
        );
        assert_eq!(
            RecognitionError::from_code("bad-grammar"),
            RecognitionError::Other("bad-grammar".into())
        );
    }

    #[test]
    fn test_code_round_trips_through_from_code() {
        for code in ["no-speech", "aborted", "network", "language-not-supported", "weird"] {
            assert_eq!(RecognitionError::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_voice_error_into_niva_error() {
        let err: NivaError = VoiceError::Recognition(RecognitionError::Network).into();
        assert!(matches!(err, NivaError::Voice(_)));
        assert!(err.to_string().contains("network"));
    }
}
