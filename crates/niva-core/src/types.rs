use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NivaError;

// =============================================================================
// Enums
// =============================================================================

/// Backend-operation category that governs how a user turn is dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Free-form conversation.
    #[default]
    Chat,
    /// Code generation from a natural-language description.
    Coding,
    /// Debugging suggestions with documentation and repository links.
    Debug,
}

impl Mode {
    /// Every mode, in display order.
    pub const ALL: [Mode; 3] = [Mode::Chat, Mode::Coding, Mode::Debug];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Chat => "chat",
            Mode::Coding => "coding",
            Mode::Debug => "debug",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = NivaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Mode::Chat),
            "coding" | "code" => Ok(Mode::Coding),
            "debug" => Ok(Mode::Debug),
            other => Err(NivaError::InvalidValue(format!("unknown mode '{}'", other))),
        }
    }
}

/// Emotional cue used by the tone-adaptation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionTag {
    #[default]
    Neutral,
    Frustrated,
    Happy,
}

impl EmotionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionTag::Neutral => "neutral",
            EmotionTag::Frustrated => "frustrated",
            EmotionTag::Happy => "happy",
        }
    }

    /// Neutral means "leave the text alone".
    pub fn is_neutral(&self) -> bool {
        matches!(self, EmotionTag::Neutral)
    }
}

impl fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionTag {
    type Err = NivaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(EmotionTag::Neutral),
            "frustrated" => Ok(EmotionTag::Frustrated),
            "happy" => Ok(EmotionTag::Happy),
            other => Err(NivaError::InvalidValue(format!(
                "unknown emotion '{}'",
                other
            ))),
        }
    }
}

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// User-toggled session switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFlag {
    /// Speak assistant turns aloud.
    VoiceNarration,
    /// Rewrite assistant text to match the selected emotion.
    ToneAdaptation,
}

impl fmt::Display for SessionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFlag::VoiceNarration => write!(f, "voice_narration"),
            SessionFlag::ToneAdaptation => write!(f, "tone_adaptation"),
        }
    }
}

/// Lifecycle state of a voice-input session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSessionState {
    /// Not listening. `start` may be called.
    #[default]
    Idle,
    /// The recognizer is capturing speech.
    Listening,
    /// A recognition error was reported. Always followed by `Idle`.
    Error,
}

impl fmt::Display for VoiceSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceSessionState::Idle => write!(f, "Idle"),
            VoiceSessionState::Listening => write!(f, "Listening"),
            VoiceSessionState::Error => write!(f, "Error"),
        }
    }
}

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Identifier of a conversation turn: epoch milliseconds at creation time,
/// strictly increasing within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub i64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out timestamp-derived turn ids that never repeat or go backwards.
#[derive(Debug, Default)]
pub struct TurnIdGenerator {
    last: i64,
}

impl TurnIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> TurnId {
        let now = Utc::now().timestamp_millis();
        let id = if now > self.last { now } else { self.last + 1 };
        self.last = id;
        TurnId(id)
    }
}

/// Position of a clip in the playback queue, assigned in request order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClipTicket(pub u64);

impl fmt::Display for ClipTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

// =============================================================================
// Newtype Wrappers - Content
// =============================================================================

/// Reference to a playable audio clip, normally a `data:` URI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipRef(String);

impl ClipRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// MIME type of a data URI (`data:audio/wav;base64,...` -> `audio/wav`).
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let header = rest.split(',').next()?;
        let mime = header.split(';').next()?;
        if mime.is_empty() {
            None
        } else {
            Some(mime)
        }
    }

    /// Base64 payload of a data URI, if it declares `;base64`.
    pub fn base64_payload(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if header.ends_with(";base64") {
            Some(payload)
        } else {
            None
        }
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Data URIs can be megabytes long; only the header is useful in logs.
        match self.mime_type() {
            Some(mime) => write!(f, "data:{} ({} bytes)", mime, self.0.len()),
            None => write!(f, "{}", self.0),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// One message in the conversation history.
///
/// Turns are built before insertion and never changed afterwards; the
/// history only hands out shared references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ConversationTurn {
    pub fn user(id: TurnId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            text: Some(text.into()),
            code: None,
            suggestions: None,
        }
    }

    pub fn assistant(id: TurnId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: Some(text.into()),
            code: None,
            suggestions: None,
        }
    }

    /// Text content, treating an empty string like a missing one.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in seconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}
