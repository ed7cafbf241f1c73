//! Phase state machine — explicit phases and legal transition guards.
//!
//! The turn engine calls `advance()` to move between phases. Each call
//! validates the transition against the phase graph and records it, so
//! a finished game carries a complete, auditable phase trace.
//!
//! Speaking is reachable only once, directly after Setup: utterances are
//! produced one time and reused for every later round.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The set of engine phases.
///
/// Every run starts at `Setup` and terminates at `Finished`; the game
/// outcome lives in `GameState::status`, not in the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Dealing hands, resolving the theme, seeding history.
    Setup,
    /// Every agent states its one clue. Runs exactly once.
    Speaking,
    /// Every active agent votes PLAY or WAIT.
    Voting,
    /// One PLAY voter commits its card to the table.
    PlayResolution,
    /// Deadlock-breaking Q&A round (entered when everyone voted WAIT).
    DiscussionRound,
    /// Terminal — the state carries a terminal status.
    Finished,
}

impl Phase {
    /// Whether this phase admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Speaking => write!(f, "speaking"),
            Self::Voting => write!(f, "voting"),
            Self::PlayResolution => write!(f, "play_resolution"),
            Self::DiscussionRound => write!(f, "discussion_round"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Legal transitions between phases:
/// ```text
/// Setup → Speaking
/// Speaking → Voting
/// Voting → PlayResolution | DiscussionRound
/// PlayResolution → Voting | Finished
/// DiscussionRound → Voting | Finished
/// ```
fn is_legal_transition(from: Phase, to: Phase) -> bool {
    use Phase::*;

    matches!(
        (from, to),
        (Setup, Speaking)
            | (Speaking, Voting)
            | (Voting, PlayResolution)
            | (Voting, DiscussionRound)
            | (PlayResolution, Voting)
            | (PlayResolution, Finished)
            | (DiscussionRound, Voting)
            | (DiscussionRound, Finished)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Phase,
    pub to: Phase,
    /// Completed discussion rounds at the time of transition.
    pub round: u32,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    /// Optional context about why this transition happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, Error)]
#[error("illegal phase transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: Phase,
    pub to: Phase,
}

/// Tracks the current phase, enforces legal transitions, and keeps the
/// full transition log for diagnostics.
pub struct PhaseMachine {
    current: Phase,
    round: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PhaseMachine {
    /// Create a new machine starting at `Setup`.
    pub fn new() -> Self {
        Self {
            current: Phase::Setup,
            round: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    /// Set the completed-round counter (called by the engine loop).
    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    /// Attempt to advance to the next phase.
    pub fn advance(&mut self, to: Phase, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, round = self.round, "phase transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
