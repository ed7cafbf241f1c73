//! Game state: the single record threaded through every phase.
//!
//! Every field has a defined default, so a partially specified state
//! (e.g. a test fixture carrying only `hands`) deserializes cleanly and
//! setup fills in the rest. Phases take the state by value and return a
//! successor; nothing mutates it concurrently.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A per-round PLAY/WAIT decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vote {
    Play,
    Wait,
}

impl Vote {
    /// Normalize free text to a vote. Anything other than `PLAY`
    /// (case-insensitive, surrounding whitespace ignored) is WAIT.
    pub fn from_text(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("PLAY") {
            Vote::Play
        } else {
            Vote::Wait
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Play => write!(f, "PLAY"),
            Vote::Wait => write!(f, "WAIT"),
        }
    }
}

/// Game status. Starts `Active` and transitions once to a terminal
/// value, after which the engine stops iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Active,
    Success,
    Failed,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Active)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Active => write!(f, "ACTIVE"),
            GameStatus::Success => write!(f, "SUCCESS"),
            GameStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        GameStatus::Active
    }
}

/// The full game state snapshot produced after each phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    /// Round topic. Chosen once at setup, immutable thereafter.
    pub theme: String,
    /// Participating agent ids, in turn order. Fixed at setup.
    pub agents: Vec<String>,
    /// Secret card per agent, pairwise distinct. Set once at setup.
    pub hands: BTreeMap<String, u8>,
    /// Remaining undrawn cards. Mutated only during setup.
    pub deck: Vec<u8>,
    /// Clue per agent, written once during the speaking phase.
    pub utterances: BTreeMap<String, String>,
    /// Current round's votes. Rewritten each voting phase, cleared
    /// after a discussion round.
    pub votes: BTreeMap<String, Vote>,
    /// Cards on the table in play order. Append-only.
    pub played_cards: Vec<u8>,
    /// Highest card played so far (0 = none played yet).
    pub last_played_card: u8,
    /// Agents who have played, in play order. Append-only.
    pub finished_agents: Vec<String>,
    /// Number of completed discussion rounds.
    pub turn_count: u32,
    pub status: GameStatus,
    /// Human-readable audit trail. Append-only.
    pub history: Vec<String>,
    /// Speaker rationale per agent. Informational only.
    pub speaker_reasonings: BTreeMap<String, String>,
    /// Estimator rationale per agent. Informational only.
    pub estimator_thoughts: BTreeMap<String, String>,
    /// Theme override supplied by the caller; wins over config theme.
    pub theme_override: String,
    pub debug: bool,
    pub reveal: bool,
}

impl GameState {
    /// A blank state for the given agents, ready for setup.
    pub fn for_agents<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agents: agents.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Agents that have not yet played, in list order.
    pub fn active_agents(&self) -> Vec<&str> {
        self.agents
            .iter()
            .filter(|a| !self.finished_agents.contains(a))
            .map(String::as_str)
            .collect()
    }

    /// Utterances visible to an estimating agent: everyone except the
    /// agent itself and all finished agents. Applied uniformly wherever
    /// an estimation subset is built.
    pub fn other_utterances(&self, agent_id: &str) -> BTreeMap<String, String> {
        self.utterances
            .iter()
            .filter(|(id, _)| id.as_str() != agent_id && !self.finished_agents.contains(id))
            .map(|(id, word)| (id.clone(), word.clone()))
            .collect()
    }

    /// Utterances of all still-active agents (shared discussion context).
    pub fn active_utterances(&self) -> BTreeMap<String, String> {
        self.utterances
            .iter()
            .filter(|(id, _)| !self.finished_agents.contains(id))
            .map(|(id, word)| (id.clone(), word.clone()))
            .collect()
    }

    /// The audit trail joined into the text form passed to providers.
    pub fn history_text(&self) -> String {
        self.history.join("\n")
    }

    /// Whether the caller pre-seeded a complete hand mapping (exactly
    /// the configured agents). Setup keeps such hands instead of dealing.
    pub fn has_complete_hands(&self) -> bool {
        !self.agents.is_empty()
            && self.hands.len() == self.agents.len()
            && self.agents.iter().all(|a| self.hands.contains_key(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_normalization() {
        assert_eq!(Vote::from_text("PLAY"), Vote::Play);
        assert_eq!(Vote::from_text("  play "), Vote::Play);
        assert_eq!(Vote::from_text("WAIT"), Vote::Wait);
        assert_eq!(Vote::from_text("pass"), Vote::Wait);
        assert_eq!(Vote::from_text(""), Vote::Wait);
    }

    #[test]
    fn default_state_is_active_and_empty() {
        let state = GameState::default();
        assert_eq!(state.status, GameStatus::Active);
        assert!(!state.status.is_terminal());
        assert_eq!(state.last_played_card, 0);
        assert_eq!(state.turn_count, 0);
        assert!(state.history.is_empty());
    }

    #[test]
    fn other_utterances_excludes_self_and_finished() {
        let mut state = GameState::for_agents(["a", "b", "c"]);
        state.utterances.insert("a".into(), "small".into());
        state.utterances.insert("b".into(), "medium".into());
        state.utterances.insert("c".into(), "huge".into());
        state.finished_agents.push("c".into());

        let others = state.other_utterances("a");
        assert_eq!(others.len(), 1);
        assert_eq!(others.get("b").map(String::as_str), Some("medium"));
    }

    #[test]
    fn complete_hands_detection() {
        let mut state = GameState::for_agents(["a", "b"]);
        assert!(!state.has_complete_hands());
        state.hands.insert("a".into(), 10);
        assert!(!state.has_complete_hands());
        state.hands.insert("b".into(), 90);
        assert!(state.has_complete_hands());
        // Wrong key set does not count as complete.
        state.hands.remove("b");
        state.hands.insert("z".into(), 90);
        assert!(!state.has_complete_hands());
    }

    #[test]
    fn state_serde_roundtrip_with_partial_input() {
        // A fixture that only pins agents and hands must deserialize,
        // with every other field at its default.
        let json = r#"{"agents":["a","b"],"hands":{"a":10,"b":90}}"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert!(state.has_complete_hands());
        assert_eq!(state.status, GameStatus::Active);

        let out = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&out).unwrap();
        assert_eq!(back.hands.get("b"), Some(&90));
    }
}
