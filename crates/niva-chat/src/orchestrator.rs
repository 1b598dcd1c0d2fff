//! Turn orchestrator: maps one user turn to backend calls and one assistant turn.
//!
//! Every submission appends exactly one user turn and one assistant turn, in
//! that order. Backend failures become the fallback reply, tone adaptation
//! failures keep the unadapted text, and narration runs in the background
//! against a playback slot reserved at submission time so clips play in
//! submission order whatever order synthesis finishes in.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use niva_core::config::ChatConfig;
use niva_core::events::{EventEmitter, Notification, NotificationKind, SessionEvent};
use niva_core::types::{ClipRef, ClipTicket, ConversationTurn, EmotionTag, Mode, Timestamp};
use niva_gateway::{
    BackendError, ChatRequest, CodeRequest, Gateway, Operation, SpeechRequest, SuggestionRequest,
    ToneRequest,
};
use niva_playback::PlaybackSequencer;

use crate::error::{ChatError, SynthesisError, ToneAdaptError};
use crate::history::ConversationHistory;
use crate::language::detect_language;
use crate::response::{mode_announcement, AssistantReply, DEBUG_LANGUAGE, DEBUG_QUERY};
use crate::session::SessionSettings;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_message_chars: usize,
    pub fallback_text: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for OrchestratorConfig {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_message_chars: config.max_message_chars,
            fallback_text: config.fallback_text.clone(),
        }
    }
}

/// What one submission produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub user: ConversationTurn,
    pub assistant: ConversationTurn,
    /// The primary backend call failed and the fallback reply was used.
    pub backend_failed: bool,
    /// The assistant text was rewritten by tone adaptation.
    pub tone_adapted: bool,
    /// Playback slot reserved for narrating the assistant turn.
    pub narration: Option<ClipTicket>,
}

/// Result of a background synthesis call, delivered back to the orchestrator.
#[derive(Debug)]
pub struct SynthesisOutcome {
    pub ticket: ClipTicket,
    pub result: Result<ClipRef, SynthesisError>,
}

pub struct TurnOrchestrator {
    gateway: Gateway,
    history: ConversationHistory,
    playback: PlaybackSequencer,
    events: EventEmitter,
    config: OrchestratorConfig,
    synth_tx: mpsc::UnboundedSender<SynthesisOutcome>,
    synth_rx: mpsc::UnboundedReceiver<SynthesisOutcome>,
    in_flight: usize,
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("turns", &self.history.len())
            .field("playback", &self.playback)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl TurnOrchestrator {
    pub fn new(
        gateway: Gateway,
        playback: PlaybackSequencer,
        events: EventEmitter,
        config: OrchestratorConfig,
    ) -> Self {
        let (synth_tx, synth_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            history: ConversationHistory::new(),
            playback,
            events,
            config,
            synth_tx,
            synth_rx,
            in_flight: 0,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn playback(&self) -> &PlaybackSequencer {
        &self.playback
    }

    /// Number of narration requests whose synthesis has not reported back.
    pub fn pending_synthesis(&self) -> usize {
        self.in_flight
    }

    /// Trim and bound-check raw input.
    pub fn validate(&self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_chars {
            return Err(ChatError::MessageTooLong(self.config.max_message_chars));
        }
        Ok(text.to_string())
    }

    /// Run one orchestration cycle.
    ///
    /// Only input validation can fail; once the user turn is appended the
    /// cycle always ends with an assistant turn.
    pub async fn submit_turn(
        &mut self,
        text: &str,
        settings: &SessionSettings,
    ) -> Result<TurnOutcome, ChatError> {
        let text = self.validate(text)?;
        let mode = settings.mode;
        // No borrow of `self` may live across the awaits below.
        let gateway = self.gateway.clone();

        let user = self.history.append_user(text.clone()).clone();
        self.emit_turn(&user);
        info!(%mode, turn_id = %user.id, "Turn submitted");

        let (mut reply, backend_failed) = match respond(&gateway, &text, mode).await {
            Ok(reply) => (reply, false),
            Err(e) => {
                warn!(%mode, error = %e, "Backend call failed, using fallback reply");
                self.events.notify(Notification::new(
                    NotificationKind::BackendFailure,
                    "An error occurred",
                    "Could not get a response from the AI.",
                ));
                (AssistantReply::text(self.config.fallback_text.clone()), true)
            }
        };

        let mut tone_adapted = false;
        if !backend_failed
            && settings.tone_adaptation
            && !settings.emotion.is_neutral()
            && !reply.text.is_empty()
        {
            match adapt_tone(&gateway, &reply.text, settings.emotion).await {
                Ok(adapted) => {
                    reply.text = adapted;
                    tone_adapted = true;
                }
                Err(e) => {
                    warn!(emotion = %settings.emotion, error = %e, "Keeping unadapted reply");
                    self.events.notify(Notification::new(
                        NotificationKind::ToneAdaptFailure,
                        "Tone Adaptation Failed",
                        "Showing the original response instead.",
                    ));
                }
            }
        }

        let assistant = self.history.append_assistant(reply).clone();
        self.emit_turn(&assistant);

        let narration = match assistant.text() {
            Some(text)
                if settings.voice_narration && !backend_failed && !text.trim().is_empty() =>
            {
                Some(self.narrate(text.to_string()))
            }
            _ => None,
        };

        debug!(
            turn_id = %assistant.id,
            backend_failed,
            tone_adapted,
            narrated = narration.is_some(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            user,
            assistant,
            backend_failed,
            tone_adapted,
            narration,
        })
    }

    /// Append the mode-switch notice. No backend call is made.
    pub fn announce_mode(&mut self, mode: Mode) -> ConversationTurn {
        self.announce(mode_announcement(mode))
    }

    /// Append an assistant turn with fixed text.
    pub fn announce(&mut self, text: impl Into<String>) -> ConversationTurn {
        let turn = self
            .history
            .append_assistant(AssistantReply::text(text))
            .clone();
        self.emit_turn(&turn);
        turn
    }

    /// Wait for the next background synthesis to report back.
    ///
    /// Cancel safe; pends forever when nothing is in flight.
    pub async fn next_synthesis(&mut self) -> Option<SynthesisOutcome> {
        self.synth_rx.recv().await
    }

    /// Fill or drop the playback slot of a finished synthesis.
    pub fn complete_synthesis(&mut self, outcome: SynthesisOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let ticket = outcome.ticket;

        match outcome.result {
            Ok(clip) => {
                debug!(%ticket, %clip, "Narration synthesized");
                if let Err(e) = self.playback.fulfill(ticket, clip) {
                    warn!(%ticket, error = %e, "Could not queue narration");
                }
            }
            Err(e) => {
                warn!(%ticket, error = %e, "Narration dropped");
                self.events.notify(Notification::new(
                    NotificationKind::SynthesisFailure,
                    "Speech Error",
                    "Could not generate audio for the response.",
                ));
                if let Err(e) = self.playback.forfeit(ticket) {
                    warn!(%ticket, error = %e, "Could not release narration slot");
                }
            }
        }
    }

    /// Process synthesis results until none are outstanding.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.synth_rx.recv().await {
                Some(outcome) => self.complete_synthesis(outcome),
                None => break,
            }
        }
    }

    pub fn on_playback_finished(&mut self) {
        self.playback.on_playback_finished();
    }

    pub fn on_playback_error(&mut self) {
        self.playback.on_playback_error();
    }

    fn narrate(&mut self, text: String) -> ClipTicket {
        let ticket = self.playback.reserve();
        let gateway = self.gateway.clone();
        let tx = self.synth_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = gateway
                .synthesize_speech(SpeechRequest { text })
                .await
                .map(|speech| speech.audio_ref)
                .map_err(|source| SynthesisError { ticket, source });
            // The receiver lives as long as the orchestrator.
            let _ = tx.send(SynthesisOutcome { ticket, result });
        });

        debug!(%ticket, "Narration requested");
        ticket
    }

    fn emit_turn(&self, turn: &ConversationTurn) {
        self.events.emit(SessionEvent::TurnAppended {
            turn: turn.clone(),
            timestamp: Timestamp::now(),
        });
    }
}

/// Primary backend call for `mode`.
async fn respond(
    gateway: &Gateway,
    text: &str,
    mode: Mode,
) -> Result<AssistantReply, BackendError> {
    match mode {
        Mode::Chat => {
            let reply = gateway
                .chat(ChatRequest {
                    message: text.to_string(),
                })
                .await?;
            Ok(AssistantReply::text(reply.reply))
        }
        Mode::Coding => {
            let language = detect_language(text);
            debug!(language, "Language hint resolved");
            let generated = gateway
                .generate_code(CodeRequest {
                    description: text.to_string(),
                    language: language.to_string(),
                })
                .await?;
            Ok(AssistantReply::code(language, generated.code))
        }
        Mode::Debug => {
            let suggestions = gateway
                .suggest(SuggestionRequest {
                    code_snippet: text.to_string(),
                    language: DEBUG_LANGUAGE.to_string(),
                    query: DEBUG_QUERY.to_string(),
                })
                .await?;
            Ok(AssistantReply::debug(suggestions))
        }
    }
}

async fn adapt_tone(
    gateway: &Gateway,
    text: &str,
    emotion: EmotionTag,
) -> Result<String, ToneAdaptError> {
    let adapted = gateway
        .adapt_tone(ToneRequest {
            emotional_cue: emotion.to_string(),
            original_text: text.to_string(),
        })
        .await
        .map_err(ToneAdaptError)?;

    if adapted.adapted_text.trim().is_empty() {
        return Err(ToneAdaptError(BackendError::InvalidResponse {
            operation: Operation::AdaptTone,
            reason: "adapted text is empty".to_string(),
        }));
    }
    Ok(adapted.adapted_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use niva_core::types::Role;
    use niva_gateway::{MockBackend, Suggestions};
    use niva_playback::RecordingSink;

    struct Harness {
        orch: TurnOrchestrator,
        backend: Arc<MockBackend>,
        sink: RecordingSink,
        events: EventEmitter,
    }

    fn harness(backend: MockBackend) -> Harness {
        let backend = Arc::new(backend);
        let sink = RecordingSink::new();
        let events = EventEmitter::new();
        let playback = PlaybackSequencer::new(Box::new(sink.clone()), events.clone());
        let orch = TurnOrchestrator::new(
            Gateway::new(backend.clone()),
            playback,
            events.clone(),
            OrchestratorConfig::default(),
        );
        Harness {
            orch,
            backend,
            sink,
            events,
        }
    }

    fn settings(mode: Mode) -> SessionSettings {
        SessionSettings {
            mode,
            ..SessionSettings::default()
        }
    }

    fn notifications(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<NotificationKind> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::Notified { notification, .. } = event {
                out.push(notification.kind);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_chat_turn_appends_user_then_assistant() {
        let mut h = harness(MockBackend::new().with_chat_reply("Hello!"));
        let out = h.orch.submit_turn("hi", &settings(Mode::Chat)).await.unwrap();

        let turns = h.orch.history().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text(), Some("hi"));
        assert_eq!(turns[1].text(), Some("Hello!"));
        assert_eq!(out.assistant.id, turns[1].id);
        assert!(!out.backend_failed);
        assert!(out.narration.is_none());
    }

    #[tokio::test]
    async fn test_empty_input_appends_nothing() {
        let mut h = harness(MockBackend::new());
        let err = h
            .orch
            .submit_turn("   \n", &settings(Mode::Chat))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(h.orch.history().is_empty());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_too_long_input_rejected() {
        let mut h = harness(MockBackend::new());
        let long = "a".repeat(OrchestratorConfig::default().max_message_chars + 1);
        let err = h.orch.submit_turn(&long, &settings(Mode::Chat)).await.unwrap_err();
        assert!(matches!(err, ChatError::MessageTooLong(_)));
        assert!(h.orch.history().is_empty());
    }

    #[tokio::test]
    async fn test_coding_scenario_python() {
        let code = "def add(a, b):\n    return a + b";
        let mut h = harness(MockBackend::new().with_code(code));
        let out = h
            .orch
            .submit_turn(
                "write a function in python that adds two numbers",
                &settings(Mode::Coding),
            )
            .await
            .unwrap();

        assert_eq!(h.backend.code_requests()[0].language, "python");
        let text = out.assistant.text().unwrap();
        assert!(text.starts_with("Here's the python code"));
        assert_eq!(out.assistant.code.as_deref(), Some(code));
    }

    #[tokio::test]
    async fn test_coding_defaults_language() {
        let mut h = harness(MockBackend::new());
        h.orch
            .submit_turn("reverse a string", &settings(Mode::Coding))
            .await
            .unwrap();
        assert_eq!(h.backend.code_requests()[0].language, "javascript");
    }

    #[tokio::test]
    async fn test_debug_scenario_links() {
        let mut h = harness(MockBackend::new().with_suggestions(Suggestions {
            suggestions: vec!["use a for loop".into()],
            documentation_links: vec!["docA".into()],
            github_links: vec!["repoA".into()],
        }));
        let out = h
            .orch
            .submit_turn("why is this loop infinite", &settings(Mode::Debug))
            .await
            .unwrap();

        assert_eq!(
            out.assistant.suggestions,
            Some(vec!["use a for loop".to_string()])
        );
        assert_eq!(
            out.assistant.code.as_deref(),
            Some("Documentation:\ndocA\n\nGitHub:\nrepoA")
        );
        let req = &h.backend.suggestion_requests()[0];
        assert_eq!(req.code_snippet, "why is this loop infinite");
        assert_eq!(req.language, DEBUG_LANGUAGE);
        assert_eq!(req.query, DEBUG_QUERY);
    }

    #[tokio::test]
    async fn test_backend_failure_yields_fallback_turn() {
        let mut h = harness(MockBackend::new().fail_on(Operation::Chat));
        let mut rx = h.events.subscribe();
        let out = h.orch.submit_turn("hello", &settings(Mode::Chat)).await.unwrap();

        assert!(out.backend_failed);
        assert_eq!(
            out.assistant.text(),
            Some(OrchestratorConfig::default().fallback_text.as_str())
        );
        assert!(out.assistant.code.is_none());
        assert!(out.assistant.suggestions.is_none());
        assert_eq!(h.orch.history().len(), 2);
        assert_eq!(notifications(&mut rx), vec![NotificationKind::BackendFailure]);
    }

    #[tokio::test]
    async fn test_tone_adaptation_replaces_text() {
        let mut h = harness(
            MockBackend::new()
                .with_chat_reply("ok")
                .with_adapted_text("Yay, ok!"),
        );
        let s = SessionSettings {
            tone_adaptation: true,
            emotion: EmotionTag::Happy,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();
        assert!(out.tone_adapted);
        assert_eq!(out.assistant.text(), Some("Yay, ok!"));
        assert_eq!(h.backend.tone_requests()[0].emotional_cue, "happy");
        assert_eq!(h.backend.tone_requests()[0].original_text, "ok");
    }

    #[tokio::test]
    async fn test_neutral_emotion_skips_tone_call() {
        let mut h = harness(MockBackend::new());
        let s = SessionSettings {
            tone_adaptation: true,
            ..SessionSettings::default()
        };
        h.orch.submit_turn("hi", &s).await.unwrap();
        assert!(h.backend.tone_requests().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_skips_tone_adaptation() {
        let mut h = harness(
            MockBackend::new()
                .with_adapted_text("So sorry!")
                .fail_on(Operation::Chat),
        );
        let s = SessionSettings {
            tone_adaptation: true,
            emotion: EmotionTag::Frustrated,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();

        assert!(out.backend_failed);
        assert!(!out.tone_adapted);
        assert_eq!(
            out.assistant.text(),
            Some(OrchestratorConfig::default().fallback_text.as_str())
        );
        assert!(out.assistant.code.is_none());
        assert!(out.assistant.suggestions.is_none());
        assert!(h.backend.tone_requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_is_not_narrated() {
        let mut h = harness(MockBackend::new().with_chat_reply("  \n "));
        let mut rx = h.events.subscribe();
        let s = SessionSettings {
            voice_narration: true,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();
        h.orch.settle().await;

        assert!(out.narration.is_none());
        assert!(h.backend.speech_requests().is_empty());
        assert!(h.orch.playback().is_empty());
        assert!(!notifications(&mut rx).contains(&NotificationKind::SynthesisFailure));
    }

    #[test]
    fn test_submit_turn_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let mut h = harness(MockBackend::new());
        let s = settings(Mode::Chat);
        let fut = h.orch.submit_turn("hi", &s);
        assert_send(&fut);
    }

    #[tokio::test]
    async fn test_tone_failure_keeps_original_text() {
        let code = "fn main() {}";
        let mut h = harness(
            MockBackend::new()
                .with_code(code)
                .fail_on(Operation::AdaptTone),
        );
        let mut rx = h.events.subscribe();
        let s = SessionSettings {
            mode: Mode::Coding,
            tone_adaptation: true,
            emotion: EmotionTag::Frustrated,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("a rust hello world", &s).await.unwrap();

        assert!(!out.tone_adapted);
        assert!(!out.backend_failed);
        assert_eq!(out.assistant.text(), Some("Here's the rust code you asked for:"));
        assert_eq!(out.assistant.code.as_deref(), Some(code));
        assert_eq!(notifications(&mut rx), vec![NotificationKind::ToneAdaptFailure]);
    }

    #[tokio::test]
    async fn test_empty_adapted_text_counts_as_failure() {
        let mut h = harness(MockBackend::new().with_chat_reply("ok").with_adapted_text("  "));
        let s = SessionSettings {
            tone_adaptation: true,
            emotion: EmotionTag::Happy,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();
        assert_eq!(out.assistant.text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_narration_plays_assistant_text() {
        let mut h = harness(MockBackend::new().with_chat_reply("Namaste"));
        let s = SessionSettings {
            voice_narration: true,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();
        assert!(out.narration.is_some());

        h.orch.settle().await;
        assert_eq!(h.sink.played(), vec![MockBackend::clip_for("Namaste")]);
        assert_eq!(h.backend.speech_requests(), vec!["Namaste"]);
    }

    #[tokio::test]
    async fn test_fallback_turn_is_not_narrated() {
        let mut h = harness(MockBackend::new().fail_on(Operation::Chat));
        let s = SessionSettings {
            voice_narration: true,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();
        assert!(out.narration.is_none());
        assert_eq!(h.orch.pending_synthesis(), 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_leaves_history_alone() {
        let mut h = harness(MockBackend::new().fail_on(Operation::SynthesizeSpeech));
        let mut rx = h.events.subscribe();
        let s = SessionSettings {
            voice_narration: true,
            ..SessionSettings::default()
        };
        let out = h.orch.submit_turn("hi", &s).await.unwrap();
        h.orch.settle().await;

        assert!(h.sink.played().is_empty());
        assert!(h.orch.playback().is_empty());
        assert_eq!(h.orch.history().last(), Some(&out.assistant));
        assert!(notifications(&mut rx).contains(&NotificationKind::SynthesisFailure));
    }

    #[tokio::test]
    async fn test_out_of_order_synthesis_plays_in_submission_order() {
        let mut h = harness(MockBackend::new());
        let gate = h.backend.gate_synthesis("alpha");
        let s = SessionSettings {
            voice_narration: true,
            ..SessionSettings::default()
        };

        let first = h.orch.submit_turn("alpha", &s).await.unwrap();
        let second = h.orch.submit_turn("beta", &s).await.unwrap();

        // The second synthesis reports back first.
        let outcome = h.orch.next_synthesis().await.unwrap();
        assert_eq!(Some(outcome.ticket), second.narration);
        h.orch.complete_synthesis(outcome);
        assert!(h.sink.played().is_empty());

        gate.notify_one();
        let outcome = h.orch.next_synthesis().await.unwrap();
        assert_eq!(Some(outcome.ticket), first.narration);
        h.orch.complete_synthesis(outcome);

        let alpha = MockBackend::clip_for("You said: alpha");
        let beta = MockBackend::clip_for("You said: beta");
        assert_eq!(h.sink.played(), vec![alpha.clone()]);

        h.orch.on_playback_finished();
        assert_eq!(h.sink.played(), vec![alpha, beta]);
    }

    #[tokio::test]
    async fn test_announce_mode_makes_no_backend_call() {
        let mut h = harness(MockBackend::new());
        let turn = h.orch.announce_mode(Mode::Debug);
        assert_eq!(turn.text(), Some("Switched to debug mode."));
        assert_eq!(turn.role, Role::Assistant);
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mode_switch_changes_only_future_dispatch() {
        let mut h = harness(MockBackend::new());
        h.orch.submit_turn("hi", &settings(Mode::Chat)).await.unwrap();
        let before: Vec<_> = h.orch.history().turns().to_vec();

        h.orch.announce_mode(Mode::Coding);
        h.orch
            .submit_turn("python sum", &settings(Mode::Coding))
            .await
            .unwrap();

        assert_eq!(&h.orch.history().turns()[..2], before.as_slice());
        assert_eq!(
            h.backend.calls(),
            vec![Operation::Chat, Operation::GenerateCode]
        );
    }
}
