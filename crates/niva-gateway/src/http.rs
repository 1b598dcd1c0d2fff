//! HTTP transport for a flow server.
//!
//! Every operation is a named flow invoked as `POST {base_url}/{flow}` with
//! body `{"data": <input>}`; the server answers `{"result": <output>}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use niva_core::config::BackendConfig;
use niva_core::error::{NivaError, Result};

use crate::backend::AssistantBackend;
use crate::error::BackendError;
use crate::types::{
    AdaptedTone, ChatReply, ChatRequest, CodeRequest, GeneratedCode, Operation, SpeechRequest,
    SuggestionRequest, Suggestions, SynthesizedSpeech, ToneRequest,
};

#[derive(Serialize)]
struct FlowInput<'a, T> {
    data: &'a T,
}

#[derive(Deserialize)]
struct FlowOutput<T> {
    result: T,
}

/// [`AssistantBackend`] that calls flows over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NivaError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let backend = Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))?;
        Ok(match &config.api_key {
            Some(key) if !key.is_empty() => backend.with_api_key(key.clone()),
            _ => backend,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn flow_url(&self, operation: Operation) -> String {
        format!("{}/{}", self.base_url, operation.flow_name())
    }

    async fn invoke<I, O>(&self, operation: Operation, input: &I) -> std::result::Result<O, BackendError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned,
    {
        let url = self.flow_url(operation);
        debug!(%operation, url = %url, "Invoking flow");

        let mut request = self.client.post(&url).json(&FlowInput { data: input });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout { operation }
            } else {
                error!(%operation, error = %e, "Flow request failed");
                BackendError::Transport {
                    operation,
                    cause: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".into());
            error!(%operation, status = %status, "Flow returned error status");
            return Err(BackendError::Status {
                operation,
                status: status.as_u16(),
                body: extract_error_message(&body),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout { operation }
            } else {
                BackendError::Transport {
                    operation,
                    cause: e.to_string(),
                }
            }
        })?;

        serde_json::from_slice::<FlowOutput<O>>(&bytes)
            .map(|out| out.result)
            .map_err(|e| BackendError::InvalidResponse {
                operation,
                reason: e.to_string(),
            })
    }
}

/// Pull `error.message` out of a flow server error body, falling back to a
/// truncated copy of the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(500).collect()
            }
        })
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn chat(&self, request: ChatRequest) -> std::result::Result<ChatReply, BackendError> {
        self.invoke(Operation::Chat, &request).await
    }

    async fn generate_code(
        &self,
        request: CodeRequest,
    ) -> std::result::Result<GeneratedCode, BackendError> {
        self.invoke(Operation::GenerateCode, &request).await
    }

    async fn suggest(
        &self,
        request: SuggestionRequest,
    ) -> std::result::Result<Suggestions, BackendError> {
        self.invoke(Operation::Suggest, &request).await
    }

    async fn adapt_tone(
        &self,
        request: ToneRequest,
    ) -> std::result::Result<AdaptedTone, BackendError> {
        self.invoke(Operation::AdaptTone, &request).await
    }

    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> std::result::Result<SynthesizedSpeech, BackendError> {
        self.invoke(Operation::SynthesizeSpeech, &request).await
    }
}
