use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{
    ClipTicket, ConversationTurn, EmotionTag, Mode, SessionFlag, Timestamp, VoiceSessionState,
};

/// Capacity of the session event channel. Slow subscribers lag and skip.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a notification is about. The UI picks wording and styling from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The primary backend call failed; a fallback turn was appended.
    BackendFailure,
    /// Tone adaptation failed; the original text was kept.
    ToneAdaptFailure,
    /// Speech synthesis failed; the turn will not be narrated.
    SynthesisFailure,
    /// An audio clip could not be played.
    PlaybackFailure,
    /// Speech recognition failed.
    RecognitionFailure,
    /// Microphone or recognition permission was refused.
    PermissionDenied,
    /// The requested mode is not offered by this client.
    ModeUnavailable,
}

/// Non-blocking, user-facing message (the toast channel).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Everything the session reports to the UI surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    // =========================================================================
    // Conversation
    // =========================================================================
    /// A turn was appended to the history.
    TurnAppended {
        turn: ConversationTurn,
        timestamp: Timestamp,
    },

    /// An orchestration cycle started or finished. Input is disabled while busy.
    BusyChanged { busy: bool, timestamp: Timestamp },

    /// The active mode changed.
    ModeChanged { mode: Mode, timestamp: Timestamp },

    /// A session flag was toggled.
    FlagChanged {
        flag: SessionFlag,
        enabled: bool,
        timestamp: Timestamp,
    },

    /// The emotion used for tone adaptation changed.
    EmotionChanged {
        emotion: EmotionTag,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Voice input
    // =========================================================================
    /// The voice session moved to a new state.
    VoiceStateChanged {
        state: VoiceSessionState,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Playback
    // =========================================================================
    /// A clip slot was added to the playback queue.
    ClipQueued {
        ticket: ClipTicket,
        timestamp: Timestamp,
    },

    /// A clip was handed to the audio sink.
    PlaybackStarted {
        ticket: ClipTicket,
        timestamp: Timestamp,
    },

    /// The active clip reached a terminal state.
    PlaybackEnded {
        ticket: ClipTicket,
        failed: bool,
        timestamp: Timestamp,
    },

    /// The queue drained and nothing is playing.
    PlaybackIdle { timestamp: Timestamp },

    // =========================================================================
    // Notifications
    // =========================================================================
    /// A recovered error or informational message for the toast channel.
    Notified {
        notification: Notification,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SessionEvent::TurnAppended { timestamp, .. }
            | SessionEvent::BusyChanged { timestamp, .. }
            | SessionEvent::ModeChanged { timestamp, .. }
            | SessionEvent::FlagChanged { timestamp, .. }
            | SessionEvent::EmotionChanged { timestamp, .. }
            | SessionEvent::VoiceStateChanged { timestamp, .. }
            | SessionEvent::ClipQueued { timestamp, .. }
            | SessionEvent::PlaybackStarted { timestamp, .. }
            | SessionEvent::PlaybackEnded { timestamp, .. }
            | SessionEvent::PlaybackIdle { timestamp }
            | SessionEvent::Notified { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::TurnAppended { .. } => "turn_appended",
            SessionEvent::BusyChanged { .. } => "busy_changed",
            SessionEvent::ModeChanged { .. } => "mode_changed",
            SessionEvent::FlagChanged { .. } => "flag_changed",
            SessionEvent::EmotionChanged { .. } => "emotion_changed",
            SessionEvent::VoiceStateChanged { .. } => "voice_state_changed",
            SessionEvent::ClipQueued { .. } => "clip_queued",
            SessionEvent::PlaybackStarted { .. } => "playback_started",
            SessionEvent::PlaybackEnded { .. } => "playback_ended",
            SessionEvent::PlaybackIdle { .. } => "playback_idle",
            SessionEvent::Notified { .. } => "notified",
        }
    }
}

/// Fan-out handle for session events.
///
/// Cloned into every component that reports to the UI. Emitting with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!(event = event.event_name(), "Session event");
        let _ = self.tx.send(event);
    }

    /// Shorthand for emitting a [`SessionEvent::Notified`].
    pub fn notify(&self, notification: Notification) {
        tracing::debug!(
            kind = ?notification.kind,
            title = %notification.title,
            "Notification raised"
        );
        self.emit(SessionEvent::Notified {
            notification,
            timestamp: Timestamp::now(),
        });
    }
}
