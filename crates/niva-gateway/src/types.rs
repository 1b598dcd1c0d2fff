//! Request and response records for each backend operation.
//!
//! Field names on the wire follow the flow server's camelCase schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use niva_core::types::ClipRef;

/// The five backend capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Chat,
    GenerateCode,
    Suggest,
    AdaptTone,
    SynthesizeSpeech,
}

impl Operation {
    /// Name of the server-side flow implementing this operation.
    pub fn flow_name(&self) -> &'static str {
        match self {
            Operation::Chat => "chatFlow",
            Operation::GenerateCode => "generateCodeFlow",
            Operation::Suggest => "provideContextAwareSuggestionsFlow",
            Operation::AdaptTone => "adaptEmotionalToneFlow",
            Operation::SynthesizeSpeech => "textToSpeechFlow",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Chat => write!(f, "chat"),
            Operation::GenerateCode => write!(f, "generate_code"),
            Operation::Suggest => write!(f, "suggest"),
            Operation::AdaptTone => write!(f, "adapt_tone"),
            Operation::SynthesizeSpeech => write!(f, "synthesize_speech"),
        }
    }
}

// =============================================================================
// Chat
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The chat flow calls this field `message`.
    #[serde(alias = "message")]
    pub reply: String,
}

// =============================================================================
// Code generation
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub description: String,
    pub language: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: String,
}

// =============================================================================
// Debug suggestions
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub code_snippet: String,
    #[serde(rename = "programmingLanguage")]
    pub language: String,
    pub query: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub documentation_links: Vec<String>,
    #[serde(default)]
    pub github_links: Vec<String>,
}

// =============================================================================
// Tone adaptation
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneRequest {
    pub emotional_cue: String,
    pub original_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptedTone {
    pub adapted_text: String,
}

// =============================================================================
// Speech synthesis
// =============================================================================

/// The speech flow takes the bare text as its input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedSpeech {
    #[serde(rename = "audioDataUri", alias = "audioRef")]
    pub audio_ref: ClipRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flow_names() {
        assert_eq!(Operation::Chat.flow_name(), "chatFlow");
        assert_eq!(Operation::GenerateCode.flow_name(), "generateCodeFlow");
        assert_eq!(
            Operation::Suggest.flow_name(),
            "provideContextAwareSuggestionsFlow"
        );
        assert_eq!(Operation::AdaptTone.flow_name(), "adaptEmotionalToneFlow");
        assert_eq!(Operation::SynthesizeSpeech.flow_name(), "textToSpeechFlow");
    }

    #[test]
    fn test_chat_reply_accepts_message_field() {
        let reply: ChatReply = serde_json::from_value(json!({"message": "hello"})).unwrap();
        assert_eq!(reply.reply, "hello");
        let reply: ChatReply = serde_json::from_value(json!({"reply": "hey"})).unwrap();
        assert_eq!(reply.reply, "hey");
    }

    #[test]
    fn test_suggestion_request_wire_names() {
        let req = SuggestionRequest {
            code_snippet: "while(true){}".into(),
            language: "javascript".into(),
            query: "why".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["codeSnippet"], "while(true){}");
        assert_eq!(value["programmingLanguage"], "javascript");
        assert_eq!(value["query"], "why");
    }

    #[test]
    fn test_suggestions_missing_lists_default_empty() {
        let s: Suggestions = serde_json::from_value(json!({"suggestions": ["a"]})).unwrap();
        assert_eq!(s.suggestions, vec!["a"]);
        assert!(s.documentation_links.is_empty());
        assert!(s.github_links.is_empty());
    }

    #[test]
    fn test_tone_wire_names() {
        let req = ToneRequest {
            emotional_cue: "happy".into(),
            original_text: "ok".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"emotionalCue": "happy", "originalText": "ok"}));

        let out: AdaptedTone = serde_json::from_value(json!({"adaptedText": "yay"})).unwrap();
        assert_eq!(out.adapted_text, "yay");
    }

    #[test]
    fn test_speech_request_is_bare_string() {
        let req = SpeechRequest {
            text: "namaste".into(),
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!("namaste"));
    }

    #[test]
    fn test_synthesized_speech_field_names() {
        let out: SynthesizedSpeech =
            serde_json::from_value(json!({"audioDataUri": "data:audio/wav;base64,AA=="}))
                .unwrap();
        assert_eq!(out.audio_ref.as_str(), "data:audio/wav;base64,AA==");

        let out: SynthesizedSpeech =
            serde_json::from_value(json!({"audioRef": "data:audio/mp3;base64,AA=="})).unwrap();
        assert_eq!(out.audio_ref.mime_type(), Some("audio/mp3"));
    }
}
