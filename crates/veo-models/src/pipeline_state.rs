//! Pipeline run identity and state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline processing state.
///
/// Runs move strictly forward through
/// `Idle -> Uploading -> Analyzing -> Generating -> Completed`;
/// `Error` is absorbing and reachable from any non-idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    Generating,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid pipeline transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl PipelineState {
    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Uploading => "uploading",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Generating => "generating",
            PipelineState::Completed => "completed",
            PipelineState::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Error)
    }

    /// The single forward successor, if any.
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Idle => Some(PipelineState::Uploading),
            PipelineState::Uploading => Some(PipelineState::Analyzing),
            PipelineState::Analyzing => Some(PipelineState::Generating),
            PipelineState::Generating => Some(PipelineState::Completed),
            PipelineState::Completed | PipelineState::Error => None,
        }
    }

    pub fn can_transition_to(&self, to: PipelineState) -> bool {
        match to {
            PipelineState::Error => !matches!(self, PipelineState::Idle | PipelineState::Error),
            _ => self.next() == Some(to),
        }
    }

    /// Validate and perform a transition.
    pub fn transition(&mut self, to: PipelineState) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(to) {
            return Err(InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let mut state = PipelineState::default();
        for next in [
            PipelineState::Uploading,
            PipelineState::Analyzing,
            PipelineState::Generating,
            PipelineState::Completed,
        ] {
            state.transition(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        let mut state = PipelineState::Uploading;
        assert!(state.transition(PipelineState::Generating).is_err());
        assert!(state.transition(PipelineState::Idle).is_err());
        assert_eq!(state, PipelineState::Uploading);
    }

    #[test]
    fn test_error_reachable_from_active_states_only() {
        for from in [
            PipelineState::Uploading,
            PipelineState::Analyzing,
            PipelineState::Generating,
            PipelineState::Completed,
        ] {
            assert!(from.can_transition_to(PipelineState::Error), "{}", from);
        }
        assert!(!PipelineState::Idle.can_transition_to(PipelineState::Error));
    }

    #[test]
    fn test_error_is_absorbing() {
        let mut state = PipelineState::Error;
        for to in [
            PipelineState::Idle,
            PipelineState::Uploading,
            PipelineState::Completed,
            PipelineState::Error,
        ] {
            assert!(state.transition(to).is_err());
        }
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&PipelineState::Analyzing).unwrap(),
            "\"analyzing\""
        );
    }
}
