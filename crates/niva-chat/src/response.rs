//! Fixed reply templates and assistant reply composition.

use niva_core::types::{ConversationTurn, Mode, TurnId};
use niva_gateway::Suggestions;

/// Query sent with every debug request.
pub const DEBUG_QUERY: &str = "Find bugs and suggest fixes for this code.";

/// Language assumed for debug requests.
pub const DEBUG_LANGUAGE: &str = "javascript";

pub const DEBUG_INTRO: &str = "Here are some suggestions to debug your code:";

/// Assistant content before it becomes a history turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub code: Option<String>,
    pub suggestions: Option<Vec<String>>,
}

impl AssistantReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
            suggestions: None,
        }
    }

    /// Reply for a code generation request.
    pub fn code(language: &str, code: String) -> Self {
        Self {
            text: format!("Here's the {} code you asked for:", language),
            code: Some(code),
            suggestions: None,
        }
    }

    /// Reply for a debug request. The code block carries the reference links.
    pub fn debug(suggestions: Suggestions) -> Self {
        Self {
            text: DEBUG_INTRO.to_string(),
            code: Some(format_links(
                &suggestions.documentation_links,
                &suggestions.github_links,
            )),
            suggestions: Some(suggestions.suggestions),
        }
    }

    pub fn into_turn(self, id: TurnId) -> ConversationTurn {
        let mut turn = ConversationTurn::assistant(id, self.text);
        turn.code = self.code;
        turn.suggestions = self.suggestions;
        turn
    }
}

/// `Documentation:` and `GitHub:` sections, one link per line.
pub fn format_links(documentation: &[String], github: &[String]) -> String {
    format!(
        "Documentation:\n{}\n\nGitHub:\n{}",
        documentation.join("\n"),
        github.join("\n")
    )
}

pub fn mode_announcement(mode: Mode) -> String {
    format!("Switched to {} mode.", mode)
}
