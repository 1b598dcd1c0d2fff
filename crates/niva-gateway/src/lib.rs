//! Backend Operation Gateway.
//!
//! Typed request/response contract for every AI operation the assistant
//! uses (chat, code generation, debug suggestions, tone adaptation, speech
//! synthesis), request validation, and an HTTP transport that talks to a
//! flow server.

pub mod backend;
pub mod error;
pub mod http;
pub mod mock;
pub mod types;

pub use backend::{AssistantBackend, Gateway};
pub use error::BackendError;
pub use http::HttpBackend;
pub use mock::MockBackend;
pub use types::{
    AdaptedTone, ChatReply, ChatRequest, CodeRequest, GeneratedCode, Operation, SpeechRequest,
    SuggestionRequest, Suggestions, SynthesizedSpeech, ToneRequest,
};
