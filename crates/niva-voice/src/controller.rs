//! Voice session controller.
//!
//! `VoiceSessionController` owns the recognizer and the voice state machine.
//! The session drives it with `start` / `stop` / `toggle_listening` and feeds
//! every recognizer callback to `handle_event`, which returns the final
//! transcript (at most once per listening session) for submission.

use tracing::{debug, info, warn};

use niva_core::events::{EventEmitter, Notification, NotificationKind, SessionEvent};
use niva_core::types::{Timestamp, VoiceSessionState};

use crate::error::{RecognitionError, VoiceError};
use crate::recognizer::{RecognitionEvent, SpeechRecognizer};
use crate::state::StateMachine;

pub struct VoiceSessionController {
    recognizer: Box<dyn SpeechRecognizer>,
    machine: StateMachine,
    language: String,
    events: EventEmitter,
    /// A stop was requested and we are waiting for `Ended`.
    stop_requested: bool,
    /// A final transcript was already delivered in this listening session.
    transcript_taken: bool,
}

impl std::fmt::Debug for VoiceSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSessionController")
            .field("state", &self.machine.current())
            .field("language", &self.language)
            .field("stop_requested", &self.stop_requested)
            .finish_non_exhaustive()
    }
}

impl VoiceSessionController {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        language: impl Into<String>,
        events: EventEmitter,
    ) -> Self {
        Self {
            recognizer,
            machine: StateMachine::new(),
            language: language.into(),
            events,
            stop_requested: false,
            transcript_taken: false,
        }
    }

    pub fn state(&self) -> VoiceSessionState {
        self.machine.current()
    }

    pub fn is_listening(&self) -> bool {
        self.machine.is_listening()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Start listening. Does nothing if already listening.
    ///
    /// Recognizer failures are not returned: the state stays `Idle` and a
    /// notification is raised instead.
    pub fn start(&mut self) -> Result<(), VoiceError> {
        if self.state() != VoiceSessionState::Idle {
            debug!(state = %self.state(), "Voice start ignored");
            return Ok(());
        }

        match self.recognizer.start(&self.language) {
            Ok(()) => {
                self.stop_requested = false;
                self.transcript_taken = false;
                self.set_state(VoiceSessionState::Listening)?;
                info!(language = %self.language, "Voice input started");
            }
            Err(err) => {
                warn!(error = %err, "Could not start voice recognition");
                self.notify_start_failure(&err);
            }
        }
        Ok(())
    }

    /// Stop listening. Does nothing unless listening.
    ///
    /// The state returns to `Idle` when the recognizer confirms with
    /// [`RecognitionEvent::Ended`], or right away if it refuses to stop.
    pub fn stop(&mut self) -> Result<(), VoiceError> {
        if !self.is_listening() || self.stop_requested {
            debug!(state = %self.state(), "Voice stop ignored");
            return Ok(());
        }

        match self.recognizer.stop() {
            Ok(()) => {
                self.stop_requested = true;
                debug!("Voice stop requested");
            }
            Err(err) => {
                warn!(error = %err, "Recognizer failed to stop, forcing idle");
                self.set_state(VoiceSessionState::Idle)?;
            }
        }
        Ok(())
    }

    pub fn toggle_listening(&mut self) -> Result<(), VoiceError> {
        if self.is_listening() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Apply a recognizer callback. Returns the trimmed transcript when a
    /// final, non-empty result is the first of this listening session.
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Result<Option<String>, VoiceError> {
        match event {
            RecognitionEvent::Started => {
                debug!("Recognizer confirmed start");
                Ok(None)
            }
            RecognitionEvent::Ended => {
                if self.is_listening() {
                    self.set_state(VoiceSessionState::Idle)?;
                    info!("Voice input ended");
                }
                self.stop_requested = false;
                Ok(None)
            }
            RecognitionEvent::Error(code) => {
                let err = RecognitionError::from_code(&code);
                if !self.is_listening() {
                    debug!(code = %code, "Recognition error while not listening");
                    return Ok(None);
                }
                warn!(code = %code, "Speech recognition error");
                self.set_state(VoiceSessionState::Error)?;
                self.notify_recognition_error(&err);
                self.stop_requested = false;
                self.set_state(VoiceSessionState::Idle)?;
                Ok(None)
            }
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                if !is_final || !self.is_listening() || self.transcript_taken {
                    return Ok(None);
                }
                let text = transcript.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                self.transcript_taken = true;
                debug!(chars = text.len(), "Final transcript received");
                Ok(Some(text.to_string()))
            }
        }
    }

    fn set_state(&mut self, state: VoiceSessionState) -> Result<(), VoiceError> {
        self.machine.transition(state)?;
        self.events.emit(SessionEvent::VoiceStateChanged {
            state,
            timestamp: Timestamp::now(),
        });
        Ok(())
    }

    fn notify_start_failure(&self, err: &RecognitionError) {
        let notification = match err {
            RecognitionError::PermissionDenied => permission_denied(),
            RecognitionError::Unsupported => Notification::new(
                NotificationKind::RecognitionFailure,
                "Voice Unavailable",
                "Speech recognition is not supported here.",
            ),
            other => Notification::new(
                NotificationKind::RecognitionFailure,
                "Voice Error",
                format!("Could not start voice recognition: {}", other.code()),
            ),
        };
        self.events.notify(notification);
    }

    fn notify_recognition_error(&self, err: &RecognitionError) {
        let notification = if err.is_permission_denied() {
            permission_denied()
        } else {
            Notification::new(
                NotificationKind::RecognitionFailure,
                "Voice Error",
                format!("Could not use voice recognition: {}", err.code()),
            )
        };
        self.events.notify(notification);
    }
}

fn permission_denied() -> Notification {
    Notification::new(
        NotificationKind::PermissionDenied,
        "Microphone Access Denied",
        "Allow microphone access to use voice input.",
    )
}
