//! The speech recognizer contract.
//!
//! A recognizer is started and stopped synchronously; everything it observes
//! afterwards (start confirmation, results, errors, end of session) comes
//! back as a [`RecognitionEvent`] delivered to the owning session.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RecognitionError;

/// Callback delivered by a running recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Ended,
    /// Recognizer error code, e.g. `not-allowed` or `no-speech`.
    Error(String),
    Result { transcript: String, is_final: bool },
}

pub trait SpeechRecognizer: Send {
    /// Begin capturing speech in `language` (a BCP-47 tag such as `en-US`).
    fn start(&mut self, language: &str) -> Result<(), RecognitionError>;

    /// Ask the recognizer to stop. Completion is signalled by
    /// [`RecognitionEvent::Ended`].
    fn stop(&mut self) -> Result<(), RecognitionError>;
}

/// Recognizer for platforms without speech input. Every start fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn start(&mut self, _language: &str) -> Result<(), RecognitionError> {
        Err(RecognitionError::Unsupported)
    }

    fn stop(&mut self) -> Result<(), RecognitionError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Script {
    next_start_error: Option<RecognitionError>,
    next_stop_error: Option<RecognitionError>,
    starts: Vec<String>,
    stops: usize,
}

/// Recognizer whose outcomes are set up ahead of time.
///
/// Clones share state, so a test can keep one handle while the controller
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRecognizer {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `start` fails with a permission error.
    pub fn deny_permission(&self) {
        self.fail_next_start(RecognitionError::PermissionDenied);
    }

    pub fn fail_next_start(&self, error: RecognitionError) {
        self.script().next_start_error = Some(error);
    }

    pub fn fail_next_stop(&self, error: RecognitionError) {
        self.script().next_stop_error = Some(error);
    }

    /// Languages passed to each successful or failed `start`.
    pub fn starts(&self) -> Vec<String> {
        self.script().starts.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.script().stops
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&mut self, language: &str) -> Result<(), RecognitionError> {
        let mut script = self.script();
        script.starts.push(language.to_string());
        match script.next_start_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<(), RecognitionError> {
        let mut script = self.script();
        script.stops += 1;
        match script.next_stop_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
