//! Voice session state machine.
//!
//! Enforces valid state transitions for a voice-input session:
//! - Idle -> Listening (recognizer started)
//! - Listening -> Idle (stop confirmed or recognition completed)
//! - Listening -> Error (recognizer reported an error)
//! - Error -> Idle (error surfaced to the user)

use niva_core::types::VoiceSessionState;

use crate::error::VoiceError;

/// Transition rules for [`VoiceSessionState`].
pub trait VoiceTransitions {
    /// Returns whether a transition from `self` to `target` is valid.
    fn can_transition_to(&self, target: &VoiceSessionState) -> bool;
}

impl VoiceTransitions for VoiceSessionState {
    fn can_transition_to(&self, target: &VoiceSessionState) -> bool {
        matches!(
            (self, target),
            (VoiceSessionState::Idle, VoiceSessionState::Listening)
                | (VoiceSessionState::Listening, VoiceSessionState::Idle)
                | (VoiceSessionState::Listening, VoiceSessionState::Error)
                | (VoiceSessionState::Error, VoiceSessionState::Idle)
        )
    }
}

/// Current voice state plus validated transitions.
///
/// Owned by a single controller; the session actor serializes access.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: VoiceSessionState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> VoiceSessionState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == VoiceSessionState::Listening
    }

    /// Attempt to transition to the target state.
    pub fn transition(&mut self, target: VoiceSessionState) -> Result<(), VoiceError> {
        if self.state.can_transition_to(&target) {
            tracing::debug!("Voice state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(VoiceError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }
}
