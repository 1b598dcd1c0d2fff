//! Line-oriented front end: parses input lines and renders session events.

use niva_chat::SessionCommand;
use niva_core::events::SessionEvent;
use niva_core::types::{ConversationTurn, EmotionTag, Mode, Role, SessionFlag, VoiceSessionState};

use crate::platform::ConsoleMicrophone;

pub const HELP: &str = "\
Commands:
  /mode <chat|coding|debug>          switch mode
  /narrate <on|off>                  speak assistant replies
  /tone <on|off>                     adapt replies to the selected emotion
  /emotion <neutral|frustrated|happy>
  /listen                            start or stop voice input
  /history                           print the conversation
  /help                              show this help
  /quit                              leave
Anything else is sent to the assistant.";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Message(String),
    Mode(Mode),
    Narrate(bool),
    Tone(bool),
    Emotion(EmotionTag),
    Listen,
    History,
    Help,
    Quit,
    /// Malformed command, with the text to show the user.
    Invalid(String),
}

impl ReplCommand {
    /// The session command this line maps to, if it is not handled locally.
    pub fn into_session_command(self) -> Option<SessionCommand> {
        match self {
            ReplCommand::Message(text) => Some(SessionCommand::SubmitTurn(text)),
            ReplCommand::Mode(mode) => Some(SessionCommand::SetMode(mode)),
            ReplCommand::Narrate(on) => Some(SessionCommand::SetFlag(SessionFlag::VoiceNarration, on)),
            ReplCommand::Tone(on) => Some(SessionCommand::SetFlag(SessionFlag::ToneAdaptation, on)),
            ReplCommand::Emotion(emotion) => Some(SessionCommand::SetEmotion(emotion)),
            ReplCommand::Listen => Some(SessionCommand::ToggleListening),
            ReplCommand::History
            | ReplCommand::Help
            | ReplCommand::Quit
            | ReplCommand::Invalid(_) => None,
        }
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ReplCommand::Message(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();

    let command = match (name.as_str(), arg) {
        ("mode", Some(arg)) => match arg.parse::<Mode>() {
            Ok(mode) => ReplCommand::Mode(mode),
            Err(e) => ReplCommand::Invalid(e.to_string()),
        },
        ("narrate", Some(arg)) => switch(arg).map_or_else(
            || ReplCommand::Invalid("usage: /narrate <on|off>".to_string()),
            ReplCommand::Narrate,
        ),
        ("tone", Some(arg)) => switch(arg).map_or_else(
            || ReplCommand::Invalid("usage: /tone <on|off>".to_string()),
            ReplCommand::Tone,
        ),
        ("emotion", Some(arg)) => match arg.parse::<EmotionTag>() {
            Ok(emotion) => ReplCommand::Emotion(emotion),
            Err(e) => ReplCommand::Invalid(e.to_string()),
        },
        ("listen", _) => ReplCommand::Listen,
        ("history", _) => ReplCommand::History,
        ("help", _) | ("?", _) => ReplCommand::Help,
        ("quit", _) | ("exit", _) => ReplCommand::Quit,
        ("mode" | "narrate" | "tone" | "emotion", None) => {
            ReplCommand::Invalid(format!("/{} needs an argument, see /help", name))
        }
        _ => ReplCommand::Invalid(format!("unknown command /{}, see /help", name)),
    };
    Some(command)
}

/// Parse `line`, handing plain text to the microphone while it is capturing.
///
/// Commands always reach the REPL, so `/listen` can end a capture. Returns
/// `None` for blank lines and for captured utterances.
pub fn route_line(line: &str, mic: &ConsoleMicrophone) -> Option<ReplCommand> {
    match parse_line(line)? {
        ReplCommand::Message(text) if mic.offer(&text) => None,
        command => Some(command),
    }
}

fn switch(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn render_turn(turn: &ConversationTurn) -> String {
    let speaker = match turn.role {
        Role::User => "you",
        Role::Assistant => "niva",
    };
    let mut out = format!("{}> {}", speaker, turn.text().unwrap_or_default());
    if let Some(code) = &turn.code {
        out.push_str("\n```\n");
        out.push_str(code);
        out.push_str("\n```");
    }
    if let Some(suggestions) = &turn.suggestions {
        for s in suggestions {
            out.push_str("\n  - ");
            out.push_str(s);
        }
    }
    out
}

/// Terminal line for an event, or `None` for events the user need not see.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::TurnAppended { turn, .. } => render_turn(turn),
        SessionEvent::BusyChanged { busy: true, .. } => "...".to_string(),
        SessionEvent::ModeChanged { mode, .. } => format!("(mode: {})", mode),
        SessionEvent::FlagChanged { flag, enabled, .. } => {
            let name = match flag {
                SessionFlag::VoiceNarration => "narration",
                SessionFlag::ToneAdaptation => "tone adaptation",
            };
            format!("({} {})", name, if *enabled { "on" } else { "off" })
        }
        SessionEvent::EmotionChanged { emotion, .. } => format!("(emotion: {})", emotion),
        SessionEvent::VoiceStateChanged { state, .. } => match state {
            VoiceSessionState::Listening => "(listening, type what you would say)".to_string(),
            VoiceSessionState::Idle => "(voice input off)".to_string(),
            VoiceSessionState::Error => return None,
        },
        SessionEvent::PlaybackStarted { ticket, .. } => format!("(speaking {})", ticket),
        SessionEvent::Notified { notification, .. } => {
            format!("[{}] {}", notification.title, notification.description)
        }
        _ => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use niva_core::events::{Notification, NotificationKind};
    use niva_core::types::{ClipTicket, Timestamp, TurnId};
    use niva_voice::{RecognitionEvent, SpeechRecognizer};

    use crate::platform::ConsoleRecognizer;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse_line("  explain closures  "),
            Some(ReplCommand::Message("explain closures".to_string()))
        );
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("/mode code"), Some(ReplCommand::Mode(Mode::Coding)));
        assert_eq!(parse_line("/narrate on"), Some(ReplCommand::Narrate(true)));
        assert_eq!(parse_line("/TONE off"), Some(ReplCommand::Tone(false)));
        assert_eq!(
            parse_line("/emotion happy"),
            Some(ReplCommand::Emotion(EmotionTag::Happy))
        );
        assert_eq!(parse_line("/listen"), Some(ReplCommand::Listen));
        assert_eq!(parse_line("/history"), Some(ReplCommand::History));
        assert_eq!(parse_line("/quit"), Some(ReplCommand::Quit));
    }

    #[test]
    fn test_bad_commands_are_invalid() {
        assert!(matches!(parse_line("/mode"), Some(ReplCommand::Invalid(_))));
        assert!(matches!(parse_line("/mode poetry"), Some(ReplCommand::Invalid(_))));
        assert!(matches!(parse_line("/narrate maybe"), Some(ReplCommand::Invalid(_))));
        assert!(matches!(parse_line("/dance"), Some(ReplCommand::Invalid(_))));
    }

    #[test]
    fn test_local_commands_have_no_session_command() {
        assert!(ReplCommand::Help.into_session_command().is_none());
        assert!(ReplCommand::History.into_session_command().is_none());
        assert!(matches!(
            ReplCommand::Narrate(true).into_session_command(),
            Some(SessionCommand::SetFlag(SessionFlag::VoiceNarration, true))
        ));
        assert!(matches!(
            ReplCommand::Message("hi".into()).into_session_command(),
            Some(SessionCommand::SubmitTurn(t)) if t == "hi"
        ));
    }

    #[test]
    fn test_commands_bypass_active_capture() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let (mut recognizer, mic) = ConsoleRecognizer::new(tx);
        recognizer.start("en-US").unwrap();

        assert_eq!(route_line("/listen", &mic), Some(ReplCommand::Listen));
        assert_eq!(route_line("/quit", &mic), Some(ReplCommand::Quit));
        assert_eq!(route_line("  ", &mic), None);
        // Capture is still open and takes the next plain line.
        assert_eq!(route_line("sort a vec", &mic), None);
        assert_eq!(
            route_line("next message", &mic),
            Some(ReplCommand::Message("next message".to_string()))
        );

        let mut transcripts = Vec::new();
        while let Ok(command) = rx.try_recv() {
            if let SessionCommand::Recognition(RecognitionEvent::Result { transcript, .. }) = command {
                transcripts.push(transcript);
            }
        }
        assert_eq!(transcripts, vec!["sort a vec".to_string()]);
    }

    #[test]
    fn test_render_turn_with_code_and_suggestions() {
        let mut turn = ConversationTurn::assistant(TurnId(1), "Here you go:");
        turn.code = Some("fn main() {}".to_string());
        turn.suggestions = Some(vec!["add tests".to_string()]);
        assert_eq!(
            render_turn(&turn),
            "niva> Here you go:\n```\nfn main() {}\n```\n  - add tests"
        );
    }

    #[test]
    fn test_render_event_filters_noise() {
        let now = Timestamp::now();
        assert!(render_event(&SessionEvent::PlaybackIdle { timestamp: now }).is_none());
        assert!(render_event(&SessionEvent::BusyChanged { busy: false, timestamp: now }).is_none());
        assert_eq!(
            render_event(&SessionEvent::PlaybackStarted {
                ticket: ClipTicket(2),
                timestamp: now
            }),
            Some("(speaking clip#2)".to_string())
        );
        let notified = SessionEvent::Notified {
            notification: Notification::new(
                NotificationKind::PlaybackFailure,
                "Playback Error",
                "Could not play audio.",
            ),
            timestamp: now,
        };
        assert_eq!(
            render_event(&notified),
            Some("[Playback Error] Could not play audio.".to_string())
        );
    }
}
