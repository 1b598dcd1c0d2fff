use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NivaError, Result};
use crate::types::{EmotionTag, Mode};

/// Greeting shown as the first assistant turn of every session.
pub const DEFAULT_GREETING: &str = "Namaste! Main Niva hoon. Aap mujhse kuch bhi puch sakte hain.";

/// Assistant text used when the primary backend call fails.
pub const DEFAULT_FALLBACK_TEXT: &str =
    "Maaf kijiye, kuch gadbad ho gayi. Kripya phir se koshish karein.";

/// Top-level configuration for the Niva assistant.
///
/// Loaded from `~/.niva/config.toml` by default. Each section corresponds
/// to one component of the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NivaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub narration: NarrationConfig,
}

impl NivaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NivaConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| NivaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chat.enabled_modes.is_empty() {
            return Err(NivaError::Config(
                "chat.enabled_modes must list at least one mode".to_string(),
            ));
        }
        if !self.chat.enabled_modes.contains(&self.chat.default_mode) {
            return Err(NivaError::Config(format!(
                "chat.default_mode '{}' is not in chat.enabled_modes",
                self.chat.default_mode
            )));
        }
        if self.chat.max_message_chars == 0 {
            return Err(NivaError::Config(
                "chat.max_message_chars must be greater than zero".to_string(),
            ));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(NivaError::Config("backend.base_url is empty".to_string()));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// AI backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the flow server; each operation is `POST {base_url}/{flow}`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional bearer token.
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3400".to_string(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Modes the user may switch to. `["chat"]` gives the single-mode client.
    pub enabled_modes: Vec<Mode>,
    /// Mode active when a session starts.
    pub default_mode: Mode,
    /// Maximum accepted input length in characters.
    pub max_message_chars: usize,
    /// First assistant turn of every session. Empty disables the greeting.
    pub greeting: String,
    /// Assistant text used when the primary backend call fails.
    pub fallback_text: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled_modes: Mode::ALL.to_vec(),
            default_mode: Mode::Chat,
            max_message_chars: 4000,
            greeting: DEFAULT_GREETING.to_string(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
        }
    }
}

/// Voice input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether voice input is offered at all.
    pub enabled: bool,
    /// BCP 47 language tag passed to the recognizer.
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "en-US".to_string(),
        }
    }
}

/// Spoken-output and tone settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Initial value of the voice narration flag.
    pub voice_narration: bool,
    /// Initial value of the tone adaptation flag.
    pub tone_adaptation: bool,
    /// Emotion selected when a session starts.
    pub default_emotion: EmotionTag,
    /// Where the terminal client writes narrated clips.
    pub clip_dir: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            voice_narration: false,
            tone_adaptation: false,
            default_emotion: EmotionTag::Neutral,
            clip_dir: "~/.niva/data/clips".to_string(),
        }
    }
}
