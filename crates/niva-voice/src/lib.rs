//! Niva Voice crate - voice-input session lifecycle.
//!
//! Drives a platform speech recognizer through a strict state machine:
//! Idle -> Listening -> (Idle | Error), Error -> Idle. Recognizer callbacks
//! arrive as [`RecognitionEvent`]s and final transcripts are handed back to
//! the caller to submit like typed input.

pub mod controller;
pub mod error;
pub mod recognizer;
pub mod state;

pub use controller::VoiceSessionController;
pub use error::{RecognitionError, VoiceError};
pub use recognizer::{RecognitionEvent, ScriptedRecognizer, SpeechRecognizer, UnavailableRecognizer};
pub use state::{StateMachine, VoiceTransitions};
