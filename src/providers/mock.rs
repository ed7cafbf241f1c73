//! Deterministic mock providers, used when no live backend is
//! configured. Behaviors are fixed so games are reproducible in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::prompts::{DEFAULT_ANSWER, DEFAULT_MODERATOR_QUESTION, DEFAULT_PLAYER_QUESTION};
use crate::state::Vote;

use super::{
    ActionReply, AnswerReply, Discussion, Estimator, ProviderError, QuestionReply, Speaker,
    WordReply,
};

/// Placeholder clue embedding the card value.
pub struct MockSpeaker;

#[async_trait]
impl Speaker for MockSpeaker {
    async fn generate_word(
        &self,
        _theme: &str,
        number: u8,
        _history: &str,
    ) -> Result<WordReply, ProviderError> {
        Ok(WordReply {
            word: format!("Mock Word (Number: {number})"),
            reasoning: "Mock reasoning because API key is missing.".to_string(),
        })
    }
}

/// Fixed threshold rule: PLAY iff the own card is below 20.
pub struct MockEstimator;

#[async_trait]
impl Estimator for MockEstimator {
    async fn decide_action(
        &self,
        _theme: &str,
        _last_played_card: u8,
        _other_utterances: &BTreeMap<String, String>,
        my_number: u8,
        _my_word: &str,
        _history: &str,
    ) -> Result<ActionReply, ProviderError> {
        let action = if my_number < 20 { Vote::Play } else { Vote::Wait };
        Ok(ActionReply {
            action,
            thought: format!("Mock thought: Number is {my_number}, so {action}."),
        })
    }
}

/// Fixed generic question and answer strings.
pub struct MockDiscussion;

#[async_trait]
impl Discussion for MockDiscussion {
    async fn generate_question(
        &self,
        _theme: &str,
        _last_played_card: u8,
        _utterances: &BTreeMap<String, String>,
        _history: &str,
    ) -> Result<QuestionReply, ProviderError> {
        Ok(QuestionReply {
            question: DEFAULT_MODERATOR_QUESTION.to_string(),
        })
    }

    async fn generate_player_question(
        &self,
        _theme: &str,
        _last_played_card: u8,
        _utterances: &BTreeMap<String, String>,
        _my_word: &str,
        _history: &str,
    ) -> Result<QuestionReply, ProviderError> {
        Ok(QuestionReply {
            question: DEFAULT_PLAYER_QUESTION.to_string(),
        })
    }

    async fn generate_answer(
        &self,
        _theme: &str,
        _question: &str,
        _my_word: &str,
        _history: &str,
    ) -> Result<AnswerReply, ProviderError> {
        Ok(AnswerReply {
            answer: DEFAULT_ANSWER.to_string(),
        })
    }
}
