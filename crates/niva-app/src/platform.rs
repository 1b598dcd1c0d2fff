//! Terminal stand-ins for the microphone and the speaker.
//!
//! Both devices report back to the session by pushing [`SessionCommand`]s
//! into an unbounded channel that `main` forwards to the session loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine;
use tokio::sync::mpsc;
use tracing::{debug, info};

use niva_chat::SessionCommand;
use niva_core::types::ClipRef;
use niva_playback::{AudioSink, PlaybackError};
use niva_voice::{RecognitionError, RecognitionEvent, SpeechRecognizer};

pub type DeviceSender = mpsc::UnboundedSender<SessionCommand>;

fn report(tx: &DeviceSender, command: SessionCommand) {
    if tx.send(command).is_err() {
        debug!("Session gone, device report dropped");
    }
}

// =============================================================================
// Console recognizer
// =============================================================================

#[derive(Debug, Default)]
struct Capture {
    active: bool,
    language: String,
}

/// Recognizer that treats the next typed line as the spoken utterance.
///
/// The REPL keeps a [`ConsoleMicrophone`] handle and offers it every plain
/// input line; slash commands never reach it.
#[derive(Debug, Clone)]
pub struct ConsoleRecognizer {
    capture: Arc<Mutex<Capture>>,
    tx: DeviceSender,
}

/// REPL side of a [`ConsoleRecognizer`].
#[derive(Debug, Clone)]
pub struct ConsoleMicrophone {
    capture: Arc<Mutex<Capture>>,
    tx: DeviceSender,
}

impl ConsoleRecognizer {
    pub fn new(tx: DeviceSender) -> (Self, ConsoleMicrophone) {
        let capture = Arc::new(Mutex::new(Capture::default()));
        let mic = ConsoleMicrophone {
            capture: Arc::clone(&capture),
            tx: tx.clone(),
        };
        (Self { capture, tx }, mic)
    }

    fn capture(&self) -> MutexGuard<'_, Capture> {
        self.capture.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&mut self, language: &str) -> Result<(), RecognitionError> {
        {
            let mut capture = self.capture();
            if capture.active {
                return Err(RecognitionError::Other("already capturing".to_string()));
            }
            capture.active = true;
            capture.language = language.to_string();
        }
        info!(language, "Console capture started");
        report(&self.tx, SessionCommand::Recognition(RecognitionEvent::Started));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecognitionError> {
        let was_active = std::mem::take(&mut self.capture().active);
        if was_active {
            report(&self.tx, SessionCommand::Recognition(RecognitionEvent::Ended));
        }
        Ok(())
    }
}

impl ConsoleMicrophone {
    /// Hand `line` to the recognizer if it is capturing.
    ///
    /// Returns `false` when nobody is listening and the line is ordinary input.
    pub fn offer(&self, line: &str) -> bool {
        let language = {
            let mut capture = self.capture();
            if !capture.active {
                return false;
            }
            capture.active = false;
            std::mem::take(&mut capture.language)
        };
        debug!(language = %language, chars = line.len(), "Utterance captured");
        report(
            &self.tx,
            SessionCommand::Recognition(RecognitionEvent::Result {
                transcript: line.to_string(),
                is_final: true,
            }),
        );
        report(&self.tx, SessionCommand::Recognition(RecognitionEvent::Ended));
        true
    }

    fn capture(&self) -> MutexGuard<'_, Capture> {
        self.capture.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// File sink
// =============================================================================

/// Audio sink that decodes data URI clips into files.
///
/// Writing the file is the whole "playback", so completion is reported right
/// after the write.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    written: u64,
    tx: DeviceSender,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, tx: DeviceSender) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
            tx,
        }
    }

    fn write_clip(&mut self, clip: &ClipRef) -> Result<PathBuf, PlaybackError> {
        let payload = clip
            .base64_payload()
            .ok_or_else(|| PlaybackError::Unsupported("not a base64 data URI".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;

        std::fs::create_dir_all(&self.dir)?;
        self.written += 1;
        let ext = extension_for(clip.mime_type().unwrap_or_default());
        let path = self.dir.join(format!("clip-{:04}.{}", self.written, ext));
        std::fs::write(&path, &bytes)?;
        Ok(path)
    }
}

impl AudioSink for FileSink {
    fn play(&mut self, clip: &ClipRef) -> Result<(), PlaybackError> {
        let path = self.write_clip(clip)?;
        info!(path = %path.display(), "Narration clip written");
        report(&self.tx, SessionCommand::PlaybackFinished);
        Ok(())
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionCommand>) -> Vec<SessionCommand> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    fn recognition(commands: &[SessionCommand]) -> Vec<RecognitionEvent> {
        commands
            .iter()
            .filter_map(|c| match c {
                SessionCommand::Recognition(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_line_ignored_when_not_capturing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_recognizer, mic) = ConsoleRecognizer::new(tx);
        assert!(!mic.offer("hello"));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_captured_line_becomes_final_transcript() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut recognizer, mic) = ConsoleRecognizer::new(tx);

        recognizer.start("hi-IN").unwrap();
        assert!(mic.offer("write a sort in rust"));
        assert!(!mic.offer("second line"));

        let events = recognition(&drain(&mut rx));
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Started,
                RecognitionEvent::Result {
                    transcript: "write a sort in rust".to_string(),
                    is_final: true,
                },
                RecognitionEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_stop_ends_capture_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut recognizer, mic) = ConsoleRecognizer::new(tx);

        recognizer.start("en-US").unwrap();
        recognizer.stop().unwrap();
        recognizer.stop().unwrap();
        assert!(!mic.offer("too late"));

        let events = recognition(&drain(&mut rx));
        assert_eq!(events, vec![RecognitionEvent::Started, RecognitionEvent::Ended]);
    }

    #[test]
    fn test_double_start_refused() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (mut recognizer, _mic) = ConsoleRecognizer::new(tx);
        recognizer.start("en-US").unwrap();
        assert!(recognizer.start("en-US").is_err());
    }

    #[test]
    fn test_file_sink_writes_decoded_clip() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = FileSink::new(dir.path().join("clips"), tx);

        // "RIFF" base64-encoded
        sink.play(&ClipRef::new("data:audio/wav;base64,UklGRg==")).unwrap();

        let path = dir.path().join("clips").join("clip-0001.wav");
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF");
        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], SessionCommand::PlaybackFinished));
    }

    #[test]
    fn test_file_sink_numbers_clips() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut sink = FileSink::new(dir.path(), tx);

        sink.play(&ClipRef::new("data:audio/mpeg;base64,AAAA")).unwrap();
        sink.play(&ClipRef::new("data:audio/mpeg;base64,AAAA")).unwrap();

        assert!(dir.path().join("clip-0001.mp3").exists());
        assert!(dir.path().join("clip-0002.mp3").exists());
    }

    #[test]
    fn test_file_sink_rejects_remote_clip() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = FileSink::new(dir.path(), tx);

        let err = sink
            .play(&ClipRef::new("https://cdn.example.com/a.wav"))
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Unsupported(_)));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_file_sink_rejects_bad_base64() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut sink = FileSink::new(dir.path(), tx);

        let err = sink
            .play(&ClipRef::new("data:audio/wav;base64,@@not-base64@@"))
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
    }

    #[test]
    fn test_extension_for_unknown_mime() {
        assert_eq!(extension_for("audio/flac"), "bin");
        assert_eq!(extension_for("audio/wav"), "wav");
    }
}
