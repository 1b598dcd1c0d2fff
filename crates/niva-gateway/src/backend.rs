//! The backend trait and the validating gateway in front of it.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::types::{
    AdaptedTone, ChatReply, ChatRequest, CodeRequest, GeneratedCode, Operation, SpeechRequest,
    SuggestionRequest, Suggestions, SynthesizedSpeech, ToneRequest,
};

/// One implementation of every AI operation the assistant relies on.
///
/// Each call is independent. Implementations must not retry; the caller
/// decides what a failure means.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError>;

    async fn generate_code(&self, request: CodeRequest) -> Result<GeneratedCode, BackendError>;

    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestions, BackendError>;

    async fn adapt_tone(&self, request: ToneRequest) -> Result<AdaptedTone, BackendError>;

    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<SynthesizedSpeech, BackendError>;
}

/// Cheaply cloneable front for an [`AssistantBackend`].
///
/// Rejects malformed requests before they leave the process and checks the
/// few response invariants callers depend on.
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn AssistantBackend>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        require(Operation::Chat, "message", &request.message)?;
        timed(Operation::Chat, self.backend.chat(request)).await
    }

    pub async fn generate_code(&self, request: CodeRequest) -> Result<GeneratedCode, BackendError> {
        require(Operation::GenerateCode, "description", &request.description)?;
        require(Operation::GenerateCode, "language", &request.language)?;
        timed(Operation::GenerateCode, self.backend.generate_code(request)).await
    }

    pub async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestions, BackendError> {
        require(Operation::Suggest, "code_snippet", &request.code_snippet)?;
        require(Operation::Suggest, "language", &request.language)?;
        require(Operation::Suggest, "query", &request.query)?;
        timed(Operation::Suggest, self.backend.suggest(request)).await
    }

    pub async fn adapt_tone(&self, request: ToneRequest) -> Result<AdaptedTone, BackendError> {
        require(Operation::AdaptTone, "emotional_cue", &request.emotional_cue)?;
        require(Operation::AdaptTone, "original_text", &request.original_text)?;
        timed(Operation::AdaptTone, self.backend.adapt_tone(request)).await
    }

    pub async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<SynthesizedSpeech, BackendError> {
        require(Operation::SynthesizeSpeech, "text", &request.text)?;
        let speech = timed(
            Operation::SynthesizeSpeech,
            self.backend.synthesize_speech(request),
        )
        .await?;

        if !speech.audio_ref.is_data_uri() {
            return Err(BackendError::InvalidResponse {
                operation: Operation::SynthesizeSpeech,
                reason: "audio reference is not a data URI".to_string(),
            });
        }
        Ok(speech)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

fn require(operation: Operation, field: &str, value: &str) -> Result<(), BackendError> {
    if value.trim().is_empty() {
        return Err(BackendError::invalid_request(
            operation,
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

async fn timed<T, F>(operation: Operation, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    let started = Instant::now();
    let result = call.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => debug!(%operation, elapsed_ms, "Backend call succeeded"),
        Err(e) => warn!(%operation, elapsed_ms, error = %e, "Backend call failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use niva_core::types::ClipRef;

    fn gateway(mock: &Arc<MockBackend>) -> Gateway {
        Gateway::new(mock.clone())
    }

    #[tokio::test]
    async fn test_chat_delegates() {
        let mock = Arc::new(MockBackend::new().with_chat_reply("hello there"));
        let reply = gateway(&mock)
            .chat(ChatRequest {
                message: "hi".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply.reply, "hello there");
        assert_eq!(mock.calls(), vec![Operation::Chat]);
    }

    #[tokio::test]
    async fn test_blank_message_rejected_without_backend_call() {
        let mock = Arc::new(MockBackend::new());
        let err = gateway(&mock)
            .chat(ChatRequest {
                message: "   ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidRequest { .. }));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_code_request_requires_language() {
        let mock = Arc::new(MockBackend::new());
        let err = gateway(&mock)
            .generate_code(CodeRequest {
                description: "sort a list".into(),
                language: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.operation(), Operation::GenerateCode);
        assert!(err.to_string().contains("language"));
    }

    #[tokio::test]
    async fn test_failure_propagates_unchanged() {
        let mock = Arc::new(MockBackend::new().fail_on(Operation::Suggest));
        let err = gateway(&mock)
            .suggest(SuggestionRequest {
                code_snippet: "x = 1".into(),
                language: "javascript".into(),
                query: "bugs?".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.operation(), Operation::Suggest);
        // No retry.
        assert_eq!(mock.calls(), vec![Operation::Suggest]);
    }

    #[tokio::test]
    async fn test_synthesis_must_return_data_uri() {
        let mock = Arc::new(
            MockBackend::new().with_speech_clip(ClipRef::new("https://cdn.example/a.wav")),
        );
        let err = gateway(&mock)
            .synthesize_speech(SpeechRequest {
                text: "namaste".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_synthesis_default_clip_is_data_uri() {
        let mock = Arc::new(MockBackend::new());
        let speech = gateway(&mock)
            .synthesize_speech(SpeechRequest {
                text: "namaste".into(),
            })
            .await
            .unwrap();
        assert_eq!(speech.audio_ref, MockBackend::clip_for("namaste"));
    }
}
