//! The conversation session actor.
//!
//! A `Session` owns the orchestrator (history, playback queue), the voice
//! controller and the user-toggled settings. All mutation goes through
//! `&mut self`, so one orchestration cycle is in flight at a time and no
//! locks are needed. A UI either calls the methods directly or sends
//! [`SessionCommand`]s to [`Session::run`].

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use niva_core::config::NivaConfig;
use niva_core::events::{EventEmitter, Notification, NotificationKind, SessionEvent};
use niva_core::types::{
    ConversationTurn, EmotionTag, Mode, SessionFlag, Timestamp, VoiceSessionState,
};
use niva_gateway::Gateway;
use niva_playback::{AudioSink, PlaybackSequencer};
use niva_voice::{RecognitionEvent, SpeechRecognizer, VoiceSessionController};

use crate::error::ChatError;
use crate::orchestrator::{OrchestratorConfig, TurnOrchestrator, TurnOutcome};

/// User-controlled switches read by the orchestrator on every turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub mode: Mode,
    pub voice_narration: bool,
    pub tone_adaptation: bool,
    pub emotion: EmotionTag,
}

impl SessionSettings {
    pub fn from_config(config: &NivaConfig) -> Self {
        Self {
            mode: config.chat.default_mode,
            voice_narration: config.narration.voice_narration,
            tone_adaptation: config.narration.tone_adaptation,
            emotion: config.narration.default_emotion,
        }
    }

    pub fn flag(&self, flag: SessionFlag) -> bool {
        match flag {
            SessionFlag::VoiceNarration => self.voice_narration,
            SessionFlag::ToneAdaptation => self.tone_adaptation,
        }
    }
}

/// Input accepted by [`Session::run`].
#[derive(Debug)]
pub enum SessionCommand {
    SubmitTurn(String),
    SetMode(Mode),
    SetFlag(SessionFlag, bool),
    SetEmotion(EmotionTag),
    ToggleListening,
    Recognition(RecognitionEvent),
    PlaybackFinished,
    PlaybackError,
    History(oneshot::Sender<Vec<ConversationTurn>>),
    Shutdown,
}

pub struct Session {
    id: Uuid,
    orchestrator: TurnOrchestrator,
    voice: VoiceSessionController,
    settings: SessionSettings,
    enabled_modes: Vec<Mode>,
    voice_enabled: bool,
    events: EventEmitter,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session and append the configured greeting.
    pub fn new(
        config: &NivaConfig,
        gateway: Gateway,
        recognizer: Box<dyn SpeechRecognizer>,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        let events = EventEmitter::new();
        let playback = PlaybackSequencer::new(sink, events.clone());
        let mut orchestrator = TurnOrchestrator::new(
            gateway,
            playback,
            events.clone(),
            OrchestratorConfig::from(&config.chat),
        );
        let voice =
            VoiceSessionController::new(recognizer, config.voice.language.clone(), events.clone());

        if !config.chat.greeting.trim().is_empty() {
            orchestrator.announce(config.chat.greeting.clone());
        }

        let id = Uuid::new_v4();
        info!(session_id = %id, mode = %config.chat.default_mode, "Session created");

        Self {
            id,
            orchestrator,
            voice,
            settings: SessionSettings::from_config(config),
            enabled_modes: config.chat.enabled_modes.clone(),
            voice_enabled: config.voice.enabled,
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.orchestrator.history().turns()
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn enabled_modes(&self) -> &[Mode] {
        &self.enabled_modes
    }

    pub fn voice_state(&self) -> VoiceSessionState {
        self.voice.state()
    }

    pub fn orchestrator(&self) -> &TurnOrchestrator {
        &self.orchestrator
    }

    /// Run one orchestration cycle for typed or recognized input.
    pub async fn submit_turn(&mut self, text: &str) -> Result<TurnOutcome, ChatError> {
        self.emit_busy(true);
        let result = self.orchestrator.submit_turn(text, &self.settings).await;
        self.emit_busy(false);
        if let Err(e) = &result {
            debug!(session_id = %self.id, error = %e, "Turn rejected");
        }
        result
    }

    /// Switch mode and announce it. Selecting the current mode does nothing.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), ChatError> {
        if !self.enabled_modes.contains(&mode) {
            self.events.notify(Notification::new(
                NotificationKind::ModeUnavailable,
                "Mode Unavailable",
                format!("{} mode is not enabled.", mode),
            ));
            return Err(ChatError::ModeUnavailable(mode));
        }
        if self.settings.mode == mode {
            return Ok(());
        }

        info!(session_id = %self.id, from = %self.settings.mode, to = %mode, "Mode changed");
        self.settings.mode = mode;
        self.events.emit(SessionEvent::ModeChanged {
            mode,
            timestamp: Timestamp::now(),
        });
        self.orchestrator.announce_mode(mode);
        Ok(())
    }

    pub fn set_flag(&mut self, flag: SessionFlag, enabled: bool) {
        if self.settings.flag(flag) == enabled {
            return;
        }
        match flag {
            SessionFlag::VoiceNarration => self.settings.voice_narration = enabled,
            SessionFlag::ToneAdaptation => self.settings.tone_adaptation = enabled,
        }
        info!(session_id = %self.id, %flag, enabled, "Session flag changed");
        self.events.emit(SessionEvent::FlagChanged {
            flag,
            enabled,
            timestamp: Timestamp::now(),
        });
    }

    pub fn set_emotion(&mut self, emotion: EmotionTag) {
        if self.settings.emotion == emotion {
            return;
        }
        self.settings.emotion = emotion;
        debug!(session_id = %self.id, %emotion, "Emotion changed");
        self.events.emit(SessionEvent::EmotionChanged {
            emotion,
            timestamp: Timestamp::now(),
        });
    }

    pub fn toggle_listening(&mut self) -> Result<(), ChatError> {
        if !self.voice_enabled && !self.voice.is_listening() {
            self.events.notify(Notification::new(
                NotificationKind::RecognitionFailure,
                "Voice Disabled",
                "Voice input is turned off in the configuration.",
            ));
            return Ok(());
        }
        self.voice.toggle_listening()?;
        Ok(())
    }

    /// Apply a recognizer callback; a final transcript is submitted as a turn.
    pub async fn handle_recognition(
        &mut self,
        event: RecognitionEvent,
    ) -> Result<Option<TurnOutcome>, ChatError> {
        match self.voice.handle_event(event)? {
            Some(transcript) => {
                info!(session_id = %self.id, "Submitting recognized speech");
                self.submit_turn(&transcript).await.map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn on_playback_finished(&mut self) {
        self.orchestrator.on_playback_finished();
    }

    pub fn on_playback_error(&mut self) {
        self.orchestrator.on_playback_error();
    }

    /// Wait for outstanding narration synthesis to land in the playback queue.
    pub async fn settle(&mut self) {
        self.orchestrator.settle().await;
    }

    /// Apply one command. Returns `false` when the session should stop.
    pub async fn handle_command(&mut self, command: SessionCommand) -> Result<bool, ChatError> {
        match command {
            SessionCommand::SubmitTurn(text) => {
                self.submit_turn(&text).await?;
            }
            SessionCommand::SetMode(mode) => self.set_mode(mode)?,
            SessionCommand::SetFlag(flag, enabled) => self.set_flag(flag, enabled),
            SessionCommand::SetEmotion(emotion) => self.set_emotion(emotion),
            SessionCommand::ToggleListening => self.toggle_listening()?,
            SessionCommand::Recognition(event) => {
                self.handle_recognition(event).await?;
            }
            SessionCommand::PlaybackFinished => self.on_playback_finished(),
            SessionCommand::PlaybackError => self.on_playback_error(),
            SessionCommand::History(reply) => {
                let _ = reply.send(self.history().to_vec());
            }
            SessionCommand::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    /// Serve commands until `Shutdown` or until every sender is dropped.
    ///
    /// Narration results are folded in between commands.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!(session_id = %self.id, "Session loop started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match self.handle_command(command).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => warn!(session_id = %self.id, error = %e, "Command failed"),
                    }
                }
                Some(outcome) = self.orchestrator.next_synthesis() => {
                    self.orchestrator.complete_synthesis(outcome);
                }
            }
        }
        if self.voice.is_listening() {
            if let Err(e) = self.voice.stop() {
                warn!(session_id = %self.id, error = %e, "Could not stop voice input");
            }
        }
        info!(session_id = %self.id, turns = self.history().len(), "Session loop stopped");
    }

    fn emit_busy(&self, busy: bool) {
        self.events.emit(SessionEvent::BusyChanged {
            busy,
            timestamp: Timestamp::now(),
        });
    }
}
