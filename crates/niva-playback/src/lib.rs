//! Niva Playback crate - strictly ordered narration playback.
//!
//! `PlaybackSequencer` keeps a FIFO of clip slots and hands at most one clip
//! at a time to an [`AudioSink`]. Slots can be reserved before their audio
//! exists so that clips play in request order even when synthesis finishes
//! out of order.

pub mod error;
pub mod sequencer;
pub mod sink;

pub use error::PlaybackError;
pub use sequencer::PlaybackSequencer;
pub use sink::{AudioSink, RecordingSink};
