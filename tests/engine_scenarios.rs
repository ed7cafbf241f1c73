//! End-to-end games with scripted providers and pre-seeded hands.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use ito_engine::human::HumanTransport;
use ito_engine::providers::mock::{MockDiscussion, MockSpeaker};
use ito_engine::providers::{ActionReply, Estimator, ProviderError};
use ito_engine::{EngineConfig, GameState, GameStatus, Phase, ProviderRegistry, TurnEngine, Vote};

/// Estimator scripted as a pure rule over (own card, table maximum).
struct ScriptedEstimator(Box<dyn Fn(u8, u8) -> Vote + Send + Sync>);

impl ScriptedEstimator {
    fn new(rule: impl Fn(u8, u8) -> Vote + Send + Sync + 'static) -> Self {
        Self(Box::new(rule))
    }
}

#[async_trait]
impl Estimator for ScriptedEstimator {
    async fn decide_action(
        &self,
        _theme: &str,
        last_played_card: u8,
        _other_utterances: &BTreeMap<String, String>,
        my_number: u8,
        _my_word: &str,
        _history: &str,
    ) -> Result<ActionReply, ProviderError> {
        Ok(ActionReply {
            action: (self.0)(my_number, last_played_card),
            thought: String::new(),
        })
    }
}

fn registry_with(estimator: ScriptedEstimator) -> ProviderRegistry {
    ProviderRegistry::new(
        Arc::new(MockSpeaker),
        Arc::new(estimator),
        Arc::new(MockDiscussion),
    )
}

fn seeded_state(hands: &[(&str, u8)]) -> GameState {
    let mut state = GameState::for_agents(hands.iter().map(|(a, _)| a.to_string()));
    for (agent, card) in hands {
        state.hands.insert(agent.to_string(), *card);
    }
    state
}

fn config_for(state: &GameState) -> EngineConfig {
    EngineConfig {
        theme: Some("動物の大きさ".into()),
        ..EngineConfig::new(state.agents.clone())
    }
}

#[tokio::test]
async fn scenario_a_ascending_play_succeeds() {
    let state = seeded_state(&[("A", 10), ("B", 90)]);
    let engine = TurnEngine::new(
        config_for(&state),
        registry_with(ScriptedEstimator::new(|_, _| Vote::Play)),
    );

    let final_state = engine.run(Some(state), None).await.unwrap();

    assert_eq!(final_state.status, GameStatus::Success);
    assert_eq!(final_state.played_cards, vec![10, 90]);
    assert_eq!(final_state.last_played_card, 90);
    assert_eq!(final_state.finished_agents, vec!["A", "B"]);
    assert_eq!(final_state.turn_count, 0);
}

#[tokio::test]
async fn scenario_b_descent_fails() {
    // A (50) volunteers first; B (10) only after something is on the table.
    let state = seeded_state(&[("A", 50), ("B", 10)]);
    let engine = TurnEngine::new(
        config_for(&state),
        registry_with(ScriptedEstimator::new(|my, last| {
            if my == 50 || last > 0 {
                Vote::Play
            } else {
                Vote::Wait
            }
        })),
    );

    let final_state = engine.run(Some(state), None).await.unwrap();

    assert_eq!(final_state.status, GameStatus::Failed);
    assert_eq!(final_state.played_cards, vec![50, 10]);
    // No further entries after the descent.
    assert_eq!(final_state.finished_agents, vec!["A", "B"]);
}

#[tokio::test]
async fn scenario_c_stagnation_fails_after_turn_budget() {
    let state = seeded_state(&[("A", 30), ("B", 70)]);
    let config = EngineConfig {
        max_turns: 2,
        ..config_for(&state)
    };
    let engine = TurnEngine::new(
        config,
        registry_with(ScriptedEstimator::new(|_, _| Vote::Wait)),
    );

    let final_state = engine.run(Some(state), None).await.unwrap();

    assert_eq!(final_state.status, GameStatus::Failed);
    assert_eq!(final_state.turn_count, 2);
    assert!(final_state.played_cards.is_empty());
    assert!(final_state.votes.is_empty(), "votes cleared after discussion");
    assert_eq!(
        final_state.history.last().map(String::as_str),
        Some("停滞が続いたため終了。")
    );
}

#[tokio::test]
async fn minimum_card_plays_first_among_play_voters() {
    let state = seeded_state(&[("a", 40), ("b", 15), ("c", 22)]);
    let engine = TurnEngine::new(
        config_for(&state),
        registry_with(ScriptedEstimator::new(|_, _| Vote::Play)),
    );

    let final_state = engine.run(Some(state), None).await.unwrap();

    assert_eq!(final_state.status, GameStatus::Success);
    assert_eq!(final_state.played_cards, vec![15, 22, 40]);
    assert_eq!(final_state.finished_agents, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn speaking_history_follows_agent_list_order() {
    let state = seeded_state(&[("Zoe", 30), ("Ann", 70), ("Mia", 5)]);
    let engine = TurnEngine::new(
        config_for(&state),
        registry_with(ScriptedEstimator::new(|_, _| Vote::Play)),
    );

    let final_state = engine.run(Some(state), None).await.unwrap();

    let speech_lines: Vec<&String> = final_state
        .history
        .iter()
        .filter(|line| line.contains("の発言"))
        .collect();
    assert_eq!(speech_lines.len(), 3);
    assert!(speech_lines[0].starts_with("Zoe "));
    assert!(speech_lines[1].starts_with("Ann "));
    assert!(speech_lines[2].starts_with("Mia "));
}

#[tokio::test]
async fn identical_discussion_proposals_are_deduplicated() {
    // MockDiscussion proposes the same fixed question for every agent.
    let state = seeded_state(&[("A", 30), ("B", 60), ("C", 80)]);
    let config = EngineConfig {
        max_turns: 1,
        ..config_for(&state)
    };
    let engine = TurnEngine::new(
        config,
        registry_with(ScriptedEstimator::new(|_, _| Vote::Wait)),
    );

    let final_state = engine.run(Some(state), None).await.unwrap();

    let questions: Vec<&String> = final_state
        .history
        .iter()
        .filter(|line| line.starts_with("質問（"))
        .collect();
    assert_eq!(questions.len(), 1, "one recorded question: {questions:?}");
    assert!(questions[0].contains("質問（A）"), "first proposer wins");

    let answers = final_state
        .history
        .iter()
        .filter(|line| line.contains("の回答"))
        .count();
    assert_eq!(answers, 3, "every active agent answers");
}

#[tokio::test]
async fn observer_sees_phases_in_order() {
    let state = seeded_state(&[("A", 10), ("B", 90)]);
    let engine = TurnEngine::new(
        config_for(&state),
        registry_with(ScriptedEstimator::new(|_, _| Vote::Play)),
    );

    let mut phases = Vec::new();
    let mut observer = |phase: Phase, _state: &GameState| phases.push(phase);
    engine.run(Some(state), Some(&mut observer)).await.unwrap();

    assert_eq!(
        phases,
        vec![
            Phase::Setup,
            Phase::Speaking,
            Phase::Voting,
            Phase::PlayResolution,
            Phase::Voting,
            Phase::PlayResolution,
        ]
    );
}

#[tokio::test]
async fn random_deal_respects_agent_count() {
    let agents: Vec<String> = (0..8).map(|i| format!("agent-{i}")).collect();
    let config = EngineConfig {
        max_turns: 1,
        theme: Some("動物の大きさ".into()),
        ..EngineConfig::new(agents)
    };
    let engine = TurnEngine::new(
        config,
        registry_with(ScriptedEstimator::new(|_, _| Vote::Wait)),
    );

    let final_state = engine.run(None, None).await.unwrap();

    assert_eq!(final_state.hands.len(), 8);
    let unique: std::collections::HashSet<u8> = final_state.hands.values().copied().collect();
    assert_eq!(unique.len(), 8);
    assert!(final_state.hands.values().all(|c| (1..=100).contains(c)));
}

/// Scripted human: empty clue, always PLAY, no discussion input.
struct ScriptedHuman;

impl HumanTransport for ScriptedHuman {
    fn ask_word(&self, _agent_id: &str, _theme: &str, _card: u8) -> String {
        String::new()
    }

    fn ask_vote(
        &self,
        _agent_id: &str,
        _last_played_card: u8,
        _other_utterances: &BTreeMap<String, String>,
    ) -> Vote {
        Vote::Play
    }

    fn ask_question(&self, _agent_id: &str) -> Option<String> {
        None
    }

    fn ask_answer(&self, _agent_id: &str, _owner: &str, _question: &str) -> Option<String> {
        None
    }
}

#[tokio::test]
async fn human_empty_clue_becomes_placeholder() {
    let state = seeded_state(&[("Human", 5), ("B", 50)]);
    let config = EngineConfig {
        human_agent_id: Some("Human".into()),
        ..config_for(&state)
    };
    let engine = TurnEngine::new(
        config,
        registry_with(ScriptedEstimator::new(|_, last| {
            if last > 0 {
                Vote::Play
            } else {
                Vote::Wait
            }
        })),
    )
    .with_human(Box::new(ScriptedHuman));

    let final_state = engine.run(Some(state), None).await.unwrap();

    assert_eq!(
        final_state.utterances.get("Human").map(String::as_str),
        Some("（無言）")
    );
    assert!(final_state
        .history
        .iter()
        .any(|line| line == "Human の発言: 『（無言）』"));
    assert_eq!(final_state.status, GameStatus::Success);
    assert_eq!(final_state.played_cards, vec![5, 50]);
}
