//! Dialog phases: Unselected → TargetChosen → (optional) SourceChosen → Confirming → Completed/Failed.
//! The phase is derived from the selection state carried in the token; the
//! transition table rejects steps the UI should never have offered.

use serde::Serialize;
use tracing::{info, warn};

use crate::dialog::SelectionState;
use crate::error::WorkflowError;

/// All phases a dialog passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DialogPhase {
    Unselected,
    TargetChosen,
    SourceChosen,
    Confirming,
    Completed,
    Failed,
}

impl std::fmt::Display for DialogPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialogPhase::Unselected => write!(f, "Unselected"),
            DialogPhase::TargetChosen => write!(f, "TargetChosen"),
            DialogPhase::SourceChosen => write!(f, "SourceChosen"),
            DialogPhase::Confirming => write!(f, "Confirming"),
            DialogPhase::Completed => write!(f, "Completed"),
            DialogPhase::Failed => write!(f, "Failed"),
        }
    }
}

impl DialogPhase {
    /// Phase of a selection that has not been confirmed yet.
    pub fn of(state: &SelectionState) -> Self {
        match (&state.target, &state.source) {
            (None, _) => DialogPhase::Unselected,
            (Some(_), None) => DialogPhase::TargetChosen,
            (Some(_), Some(_)) => DialogPhase::SourceChosen,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DialogPhase::Completed | DialogPhase::Failed)
    }

    /// Returns whether moving from `self` to `next` is valid.
    pub fn can_transition_to(self, next: DialogPhase) -> bool {
        use DialogPhase::*;
        matches!(
            (self, next),
            // page navigation and re-renders
            (Unselected, Unselected)
                | (TargetChosen, TargetChosen)
                | (SourceChosen, SourceChosen)
                | (Unselected, TargetChosen) // choose target
                | (TargetChosen, Unselected) // clear target
                | (TargetChosen, SourceChosen) // choose source
                | (SourceChosen, TargetChosen) // clear source
                | (SourceChosen, Unselected) // clear target, source kept
                | (Unselected, SourceChosen) // choose target with source kept
                | (TargetChosen, Confirming)
                | (SourceChosen, Confirming)
                | (Confirming, Completed)
                | (Confirming, Failed)
                // content can expire under any open dialog
                | (Unselected, Failed)
                | (TargetChosen, Failed)
                | (SourceChosen, Failed)
        )
    }
}

/// Validate and log one transition.
pub fn transition(from: DialogPhase, to: DialogPhase) -> Result<DialogPhase, WorkflowError> {
    if !from.can_transition_to(to) {
        warn!(from = %from, to = %to, "invalid_dialog_transition");
        return Err(match to {
            DialogPhase::Confirming => WorkflowError::MissingTarget,
            _ => WorkflowError::MalformedToken(format!("invalid transition {from} -> {to}")),
        });
    }
    info!(from = %from, to = %to, "dialog_transition");
    Ok(to)
}

/// Log a step into a terminal phase whose outcome is already decided. A
/// rejected step is only reported.
pub fn record_terminal(from: DialogPhase, to: DialogPhase) {
    debug_assert!(to.is_terminal(), "{to} is not terminal");
    if let Err(e) = transition(from, to) {
        warn!(from = %from, to = %to, error = %e, "terminal_transition_rejected");
    }
}
