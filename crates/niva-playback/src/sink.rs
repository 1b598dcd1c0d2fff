//! Audio output contract.

use std::sync::{Arc, Mutex, MutexGuard};

use niva_core::types::ClipRef;

use crate::error::PlaybackError;

/// Starts playback of one clip.
///
/// `play` must return promptly. When the clip ends (or fails mid-way) the
/// owner reports it through `PlaybackSequencer::on_playback_finished` or
/// `on_playback_error`. An `Err` from `play` means the clip never started.
pub trait AudioSink: Send + Sync {
    fn play(&mut self, clip: &ClipRef) -> Result<(), PlaybackError>;
}

#[derive(Debug, Default)]
struct Recording {
    played: Vec<ClipRef>,
    failing: Vec<ClipRef>,
}

/// Sink that remembers what it was asked to play.
///
/// Clones share state. Clips registered with `fail_on` are refused.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, clip: ClipRef) {
        self.inner().failing.push(clip);
    }

    /// Every clip passed to `play`, including refused ones, in call order.
    pub fn played(&self) -> Vec<ClipRef> {
        self.inner().played.clone()
    }

    fn inner(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AudioSink for RecordingSink {
    fn play(&mut self, clip: &ClipRef) -> Result<(), PlaybackError> {
        let mut inner = self.inner();
        inner.played.push(clip.clone());
        if inner.failing.contains(clip) {
            return Err(PlaybackError::Sink(format!("refused {}", clip)));
        }
        Ok(())
    }
}
