//! Scriptable in-process backend.
//!
//! `MockBackend` answers every operation from canned values, records the
//! requests it received, and can be told to fail or to hold a speech
//! synthesis call until the test releases it. Used by the unit tests here,
//! by the session integration tests, and by `niva --offline`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::Notify;

use niva_core::types::ClipRef;

use crate::backend::AssistantBackend;
use crate::error::BackendError;
use crate::types::{
    AdaptedTone, ChatReply, ChatRequest, CodeRequest, GeneratedCode, Operation, SpeechRequest,
    SuggestionRequest, Suggestions, SynthesizedSpeech, ToneRequest,
};

#[derive(Debug, Default)]
struct Script {
    chat_reply: Option<String>,
    code: Option<String>,
    suggestions: Suggestions,
    adapted_text: Option<String>,
    speech_clip: Option<ClipRef>,
    failing: HashSet<Operation>,
    gates: Vec<(String, Arc<Notify>)>,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<Operation>,
    code_requests: Vec<CodeRequest>,
    suggestion_requests: Vec<SuggestionRequest>,
    tone_requests: Vec<ToneRequest>,
    speech_requests: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<Script>,
    recorded: Mutex<Recorded>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat_reply(self, reply: impl Into<String>) -> Self {
        self.script().chat_reply = Some(reply.into());
        self
    }

    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.script().code = Some(code.into());
        self
    }

    pub fn with_suggestions(self, suggestions: Suggestions) -> Self {
        self.script().suggestions = suggestions;
        self
    }

    pub fn with_adapted_text(self, text: impl Into<String>) -> Self {
        self.script().adapted_text = Some(text.into());
        self
    }

    pub fn with_speech_clip(self, clip: ClipRef) -> Self {
        self.script().speech_clip = Some(clip);
        self
    }

    pub fn fail_on(self, operation: Operation) -> Self {
        self.set_failing(operation, true);
        self
    }

    /// Make `operation` fail (or succeed again) from now on.
    pub fn set_failing(&self, operation: Operation, failing: bool) {
        let mut script = self.script();
        if failing {
            script.failing.insert(operation);
        } else {
            script.failing.remove(&operation);
        }
    }

    /// Hold any synthesis whose text contains `needle` until the returned
    /// handle is notified.
    pub fn gate_synthesis(&self, needle: impl Into<String>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.script().gates.push((needle.into(), notify.clone()));
        notify
    }

    /// The clip the mock synthesizes for `text` unless told otherwise.
    pub fn clip_for(text: &str) -> ClipRef {
        let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        ClipRef::new(format!("data:audio/wav;base64,{}", payload))
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.recorded().calls.clone()
    }

    pub fn code_requests(&self) -> Vec<CodeRequest> {
        self.recorded().code_requests.clone()
    }

    pub fn suggestion_requests(&self) -> Vec<SuggestionRequest> {
        self.recorded().suggestion_requests.clone()
    }

    pub fn tone_requests(&self) -> Vec<ToneRequest> {
        self.recorded().tone_requests.clone()
    }

    pub fn speech_requests(&self) -> Vec<String> {
        self.recorded().speech_requests.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, operation: Operation) -> Result<(), BackendError> {
        self.recorded().calls.push(operation);
        if self.script().failing.contains(&operation) {
            return Err(BackendError::Transport {
                operation,
                cause: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AssistantBackend for MockBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        self.begin(Operation::Chat)?;
        let reply = self
            .script()
            .chat_reply
            .clone()
            .unwrap_or_else(|| format!("You said: {}", request.message));
        Ok(ChatReply { reply })
    }

    async fn generate_code(&self, request: CodeRequest) -> Result<GeneratedCode, BackendError> {
        self.recorded().code_requests.push(request.clone());
        self.begin(Operation::GenerateCode)?;
        let code = self
            .script()
            .code
            .clone()
            .unwrap_or_else(|| format!("// {}", request.description));
        Ok(GeneratedCode { code })
    }

    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestions, BackendError> {
        self.recorded().suggestion_requests.push(request);
        self.begin(Operation::Suggest)?;
        Ok(self.script().suggestions.clone())
    }

    async fn adapt_tone(&self, request: ToneRequest) -> Result<AdaptedTone, BackendError> {
        self.recorded().tone_requests.push(request.clone());
        self.begin(Operation::AdaptTone)?;
        let adapted_text = self.script().adapted_text.clone().unwrap_or_else(|| {
            format!("({}) {}", request.emotional_cue, request.original_text)
        });
        Ok(AdaptedTone { adapted_text })
    }

    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<SynthesizedSpeech, BackendError> {
        self.recorded().speech_requests.push(request.text.clone());

        let gates: Vec<Arc<Notify>> = self
            .script()
            .gates
            .iter()
            .filter(|(needle, _)| request.text.contains(needle.as_str()))
            .map(|(_, notify)| notify.clone())
            .collect();
        for gate in gates {
            gate.notified().await;
        }

        self.begin(Operation::SynthesizeSpeech)?;
        let audio_ref = self
            .script()
            .speech_clip
            .clone()
            .unwrap_or_else(|| Self::clip_for(&request.text));
        Ok(SynthesizedSpeech { audio_ref })
    }
}
