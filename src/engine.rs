//! Turn engine: drives Setup → Speaking → {Voting → PlayResolution |
//! DiscussionRound} → Finished over a single game state.
//!
//! The engine owns exclusive access to the state; each phase takes it by
//! value and returns the successor. Decision providers are consulted
//! through the registry, which absorbs every provider failure, so the
//! only fatal error is a setup that cannot deal a card to every agent.

use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::deck::{self, EmptyDeckError};
use crate::human::HumanTransport;
use crate::phase::{IllegalTransition, Phase, PhaseMachine};
use crate::prompts::{DEFAULT_MODERATOR_QUESTION, SILENT_UTTERANCE, THEMES_JA};
use crate::providers::ProviderRegistry;
use crate::state::{GameState, GameStatus, Vote};

/// Observer invoked once per completed phase with the phase name and
/// the resulting snapshot. Must not mutate the snapshot.
pub type PhaseObserver<'a> = &'a mut dyn FnMut(Phase, &GameState);

/// Owner label for the moderator-fallback discussion question.
const MODERATOR: &str = "(moderator)";

#[derive(Debug, Error)]
pub enum EngineError {
    /// More agents than cards — no fallback card exists.
    #[error("cannot deal {agents} agents from a 100-card deck")]
    TooManyAgents { agents: usize },
    #[error(transparent)]
    Deck(#[from] EmptyDeckError),
    #[error("invalid engine configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Phase(#[from] IllegalTransition),
}

pub struct TurnEngine {
    config: EngineConfig,
    providers: ProviderRegistry,
    human: Option<Box<dyn HumanTransport>>,
}

impl TurnEngine {
    pub fn new(config: EngineConfig, providers: ProviderRegistry) -> Self {
        Self {
            config,
            providers,
            human: None,
        }
    }

    /// Attach the interactive transport for `config.human_agent_id`.
    pub fn with_human(mut self, transport: Box<dyn HumanTransport>) -> Self {
        self.human = Some(transport);
        self
    }

    /// Run the game to completion and return the final state.
    ///
    /// `initial` may pre-seed a complete `hands` mapping (and any other
    /// fields) for reproducible games; otherwise setup deals randomly.
    pub async fn run(
        &self,
        initial: Option<GameState>,
        mut observer: Option<PhaseObserver<'_>>,
    ) -> Result<GameState, EngineError> {
        self.config
            .validate()
            .map_err(EngineError::Config)?;

        let mut machine = PhaseMachine::new();
        let seed = initial
            .unwrap_or_else(|| GameState::for_agents(self.config.agent_ids.iter().cloned()));

        let mut state = self.setup(seed)?;
        emit(&mut observer, Phase::Setup, &state);

        machine.advance(Phase::Speaking, None)?;
        state = self.speaking(state).await;
        emit(&mut observer, Phase::Speaking, &state);

        loop {
            machine.advance(Phase::Voting, None)?;
            state = self.voting(state).await;
            emit(&mut observer, Phase::Voting, &state);

            let play_votes = state.votes.values().filter(|v| **v == Vote::Play).count();
            if play_votes > 0 {
                machine.advance(Phase::PlayResolution, Some("at least one PLAY vote"))?;
                state = self.play_resolution(state);
                emit(&mut observer, Phase::PlayResolution, &state);
            } else {
                machine.advance(Phase::DiscussionRound, Some("all active agents voted WAIT"))?;
                state = self.discussion_round(state).await;
                machine.set_round(state.turn_count);
                emit(&mut observer, Phase::DiscussionRound, &state);
            }

            if state.status.is_terminal() {
                machine.advance(Phase::Finished, Some(&state.status.to_string()))?;
                break;
            }
        }

        debug!(
            transitions = machine.transitions().len(),
            status = %state.status,
            "game finished"
        );
        Ok(state)
    }

    /// Deal hands, resolve the theme, seed the audit trail.
    fn setup(&self, mut state: GameState) -> Result<GameState, EngineError> {
        if state.agents.is_empty() {
            state.agents = self.config.agent_ids.clone();
        }
        if state.agents.len() > 100 {
            return Err(EngineError::TooManyAgents {
                agents: state.agents.len(),
            });
        }

        if state.has_complete_hands() {
            // Pre-dealt fixture: keep the hands, remove them from the deck.
            let used: Vec<u8> = state.hands.values().copied().collect();
            state.deck = deck::create_deck()
                .into_iter()
                .filter(|card| !used.contains(card))
                .collect();
        } else {
            state.hands.clear();
            state.deck = deck::create_deck();
            for agent in &state.agents {
                let card = deck::draw(&mut state.deck)?;
                state.hands.insert(agent.clone(), card);
            }
        }

        let theme_override = state.theme_override.trim().to_string();
        state.theme = if !theme_override.is_empty() {
            theme_override.clone()
        } else if let Some(theme) = &self.config.theme {
            theme.clone()
        } else {
            THEMES_JA
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or("動物の大きさ")
                .to_string()
        };
        state.theme_override = theme_override;

        if state.history.is_empty() {
            state.history = vec![format!("ゲーム開始。お題: {}", state.theme)];
        }

        state.played_cards.clear();
        state.last_played_card = 0;
        state.utterances.clear();
        state.votes.clear();
        state.finished_agents.clear();
        state.speaker_reasonings.clear();
        state.estimator_thoughts.clear();
        state.turn_count = 0;
        state.status = GameStatus::Active;
        state.debug = self.config.debug;
        state.reveal = self.config.reveal_hands;

        info!(theme = %state.theme, agents = state.agents.len(), "game set up");
        if state.reveal {
            for (agent, card) in &state.hands {
                debug!(agent = %agent, card, "dealt hand");
            }
        }
        Ok(state)
    }

    /// Every agent states its one clue, in agent-list order.
    async fn speaking(&self, mut state: GameState) -> GameState {
        let history_text = state.history_text();
        let mut lines = Vec::new();

        for agent in state.agents.clone() {
            if state.finished_agents.contains(&agent) {
                continue;
            }
            let Some(card) = state.hands.get(&agent).copied() else {
                warn!(agent = %agent, "no hand dealt — skipping speaker");
                continue;
            };

            let (word, reasoning) = if let Some(human) = self.human_for(&agent) {
                let input = human.ask_word(&agent, &state.theme, card);
                let word = if input.trim().is_empty() {
                    SILENT_UTTERANCE.to_string()
                } else {
                    input.trim().to_string()
                };
                (word, String::new())
            } else {
                let reply = self
                    .providers
                    .word_or_default(&state.theme, card, &history_text)
                    .await;
                (reply.word, reply.reasoning)
            };

            if state.reveal {
                info!(agent = %agent, word = %word, card, "utterance");
            } else {
                info!(agent = %agent, word = %word, "utterance");
            }
            if state.debug && !reasoning.is_empty() {
                debug!(agent = %agent, reasoning = %reasoning, "speaker rationale");
            }

            lines.push(format!("{agent} の発言: 『{word}』"));
            state.utterances.insert(agent.clone(), word);
            state.speaker_reasonings.insert(agent, reasoning);
        }

        state.history.extend(lines);
        state
    }

    /// Every active agent votes PLAY or WAIT, in agent-list order.
    async fn voting(&self, mut state: GameState) -> GameState {
        let history_text = state.history_text();
        let mut votes = std::collections::BTreeMap::new();
        let mut thoughts = std::collections::BTreeMap::new();

        for agent in state.agents.clone() {
            if state.finished_agents.contains(&agent) {
                continue;
            }
            let Some(card) = state.hands.get(&agent).copied() else {
                continue;
            };
            let word = state.utterances.get(&agent).cloned().unwrap_or_default();
            let others = state.other_utterances(&agent);

            let (vote, thought) = if let Some(human) = self.human_for(&agent) {
                (
                    human.ask_vote(&agent, state.last_played_card, &others),
                    String::new(),
                )
            } else {
                let reply = self
                    .providers
                    .action_or_default(
                        &state.theme,
                        state.last_played_card,
                        &others,
                        card,
                        &word,
                        &history_text,
                    )
                    .await;
                (reply.action, reply.thought)
            };

            info!(agent = %agent, vote = %vote, "vote");
            if state.debug && !thought.is_empty() {
                debug!(agent = %agent, thought = %thought, "estimator rationale");
            }
            votes.insert(agent.clone(), vote);
            thoughts.insert(agent, thought);
        }

        state.votes = votes;
        state.estimator_thoughts = thoughts;
        state
    }

    /// The PLAY voter holding the minimum card commits it to the table.
    fn play_resolution(&self, mut state: GameState) -> GameState {
        let Some(player) = play_candidate(&state) else {
            return state;
        };
        let player = player.to_string();
        let card = state.hands[&player];

        info!(player = %player, card, "card played");

        let previous = state.last_played_card;
        state.played_cards.push(card);
        state.last_played_card = card;
        state.finished_agents.push(player.clone());
        state.history.push(format!("{player} が {card} を出した。"));

        state.status = if card < previous {
            warn!(card, previous, "descent — game over");
            GameStatus::Failed
        } else if state.finished_agents.len() == state.agents.len() {
            info!("all cards played in ascending order");
            GameStatus::Success
        } else {
            GameStatus::Active
        };
        state
    }

    /// Deadlock-breaking Q&A: proposals (deduplicated), answers, and the
    /// turn-budget check. Entered only when every active agent waited.
    async fn discussion_round(&self, mut state: GameState) -> GameState {
        info!("all agents voted WAIT — entering discussion");

        let history_text = state.history_text();
        let active: Vec<String> = state
            .active_agents()
            .iter()
            .map(|a| a.to_string())
            .collect();
        let shared_utterances = state.active_utterances();

        // Every active agent proposes one question; exact-text duplicates
        // are discarded (first proposer wins).
        let mut proposals: Vec<(String, String)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for agent in &active {
            let my_word = state.utterances.get(agent).cloned().unwrap_or_default();

            let question = if let Some(human) = self.human_for(agent) {
                human.ask_question(agent)
            } else {
                let reply = self
                    .providers
                    .player_question_or_default(
                        &state.theme,
                        state.last_played_card,
                        &shared_utterances,
                        &my_word,
                        &history_text,
                    )
                    .await;
                Some(reply.question)
            };

            if let Some(question) = question.map(|q| q.trim().to_string()) {
                if !question.is_empty() && seen.insert(question.clone()) {
                    info!(agent = %agent, question = %question, "question proposed");
                    proposals.push((agent.clone(), question));
                }
            }
        }

        if proposals.is_empty() {
            let reply = self
                .providers
                .question_or_default(
                    &state.theme,
                    state.last_played_card,
                    &shared_utterances,
                    &history_text,
                )
                .await;
            let question = reply.question.trim().to_string();
            let question = if question.is_empty() {
                DEFAULT_MODERATOR_QUESTION.to_string()
            } else {
                question
            };
            proposals.push((MODERATOR.to_string(), question));
        }

        let mut lines = vec!["全員WAIT。".to_string()];

        // Every active agent answers every distinct question, in
        // question-then-answers order.
        for (owner, question) in &proposals {
            lines.push(format!("質問（{owner}）: {question}"));

            for agent in &active {
                let my_word = state.utterances.get(agent).cloned().unwrap_or_default();

                let answer = if let Some(human) = self.human_for(agent) {
                    human.ask_answer(agent, owner, question)
                } else {
                    let reply = self
                        .providers
                        .answer_or_default(&state.theme, question, &my_word, &history_text)
                        .await;
                    Some(reply.answer)
                };

                if let Some(answer) = answer.map(|a| a.trim().to_string()) {
                    if !answer.is_empty() {
                        lines.push(format!("{agent} の回答（質問者={owner}）: {answer}"));
                    }
                }
            }
        }

        state.turn_count += 1;
        state.votes.clear();
        state.history.extend(lines);

        // The turn budget is enforced exactly here, at the round boundary.
        if state.turn_count >= self.config.max_turns {
            warn!(turns = state.turn_count, "stagnation — turn budget exhausted");
            state.history.push("停滞が続いたため終了。".to_string());
            state.status = GameStatus::Failed;
        }
        state
    }

    fn human_for(&self, agent_id: &str) -> Option<&dyn HumanTransport> {
        match (&self.human, &self.config.human_agent_id) {
            (Some(transport), Some(human_id)) if human_id == agent_id => Some(transport.as_ref()),
            _ => None,
        }
    }
}

fn emit(observer: &mut Option<PhaseObserver<'_>>, phase: Phase, state: &GameState) {
    if let Some(cb) = observer.as_mut() {
        cb(phase, state);
    }
}

/// The agent that plays this round: minimum hand card among PLAY voters.
/// Card values are pairwise distinct, so no true tie exists.
fn play_candidate(state: &GameState) -> Option<&str> {
    state
        .votes
        .iter()
        .filter(|(_, vote)| **vote == Vote::Play)
        .filter_map(|(agent, _)| state.hands.get(agent).map(|card| (agent.as_str(), *card)))
        .min_by_key(|(_, card)| *card)
        .map(|(agent, _)| agent)
}
