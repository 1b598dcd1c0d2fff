//! Conversation orchestration for Niva.
//!
//! Turns user input (typed or recognized) into backend calls and assistant
//! turns, keeps the append-only history, and schedules narration of
//! assistant replies. [`Session`] ties the orchestrator, the voice
//! controller and the user-facing settings into one actor.

pub mod error;
pub mod history;
pub mod language;
pub mod orchestrator;
pub mod response;
pub mod session;

pub use error::{ChatError, SynthesisError, ToneAdaptError};
pub use history::ConversationHistory;
pub use language::detect_language;
pub use orchestrator::{OrchestratorConfig, SynthesisOutcome, TurnOrchestrator, TurnOutcome};
pub use response::AssistantReply;
pub use session::{Session, SessionCommand, SessionSettings};
