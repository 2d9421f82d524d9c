use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a game session.
///
/// The machine moves forward through gameplay and never leaves a terminal
/// status; concurrency control lives in the storage layer (answer inserts
/// and session updates are compare-and-set), so transitions themselves are
/// pure and synchronous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session exists but gameplay has not started.
    Setup,
    /// Gameplay is active; answers are accepted.
    InProgress,
    /// Gameplay is suspended; pointers are frozen.
    Paused,
    /// All rounds finished or the host ended the game. Terminal.
    Completed,
    /// The owner abandoned the session before completion. Terminal.
    Cancelled,
}

/// Events that drive a session through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Leave setup and begin the first round.
    Start,
    /// Suspend active gameplay.
    Pause,
    /// Resume suspended gameplay.
    Resume,
    /// Finish the game, either naturally or by host decision.
    Complete,
    /// Abandon the session.
    Cancel,
}

/// Error returned when an event cannot be applied to the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the session was in when the event was received.
    pub from: SessionStatus,
    /// The rejected event.
    pub event: SessionEvent,
}

impl SessionStatus {
    /// Whether the session can never change status again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    /// Compute the status reached by applying `event`, if the transition is
    /// valid.
    pub fn apply(self, event: SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        let next = match (self, event) {
            (SessionStatus::Setup, SessionEvent::Start) => SessionStatus::InProgress,
            (SessionStatus::InProgress, SessionEvent::Pause) => SessionStatus::Paused,
            (SessionStatus::Paused, SessionEvent::Resume) => SessionStatus::InProgress,
            (SessionStatus::InProgress | SessionStatus::Paused, SessionEvent::Complete) => {
                SessionStatus::Completed
            }
            (from, SessionEvent::Cancel) if !from.is_terminal() => SessionStatus::Cancelled,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
