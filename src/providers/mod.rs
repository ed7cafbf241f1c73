//! Decision providers: the external capabilities the engine consults.
//!
//! Three roles (speaker, estimator, discussion), each behind a trait
//! with a Live implementation (remote model) and a Mock implementation
//! (deterministic, no backend). The engine never talks to a trait
//! directly — it goes through [`ProviderRegistry`], whose methods absorb
//! every failure (request error, undecodable response, timeout) into a
//! role-specific safe default so the turn sequence always completes.

pub mod live;
pub mod mock;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::{ProviderSettings, Role};
use crate::decode::DecodeError;
use crate::prompts::{DEFAULT_ANSWER, DEFAULT_MODERATOR_QUESTION, DEFAULT_PLAYER_QUESTION};
use crate::state::Vote;

/// Provider call failure. Absorbed by the registry, never surfaced to
/// the engine loop.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("inference request failed: {0}")]
    Request(String),
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    #[error("response decoding failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Speaker result: one clue plus its rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordReply {
    pub word: String,
    pub reasoning: String,
}

/// Estimator result: a normalized vote plus its rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReply {
    pub action: Vote,
    pub thought: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReply {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerReply {
    pub answer: String,
}

/// Produces one non-numeric clue for a secret card.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn generate_word(
        &self,
        theme: &str,
        number: u8,
        history: &str,
    ) -> Result<WordReply, ProviderError>;
}

/// Decides PLAY or WAIT from the visible clues.
#[async_trait]
pub trait Estimator: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn decide_action(
        &self,
        theme: &str,
        last_played_card: u8,
        other_utterances: &BTreeMap<String, String>,
        my_number: u8,
        my_word: &str,
        history: &str,
    ) -> Result<ActionReply, ProviderError>;
}

/// Deadlock-breaking discussion capabilities.
#[async_trait]
pub trait Discussion: Send + Sync {
    /// Moderator fallback question when no player proposes one.
    async fn generate_question(
        &self,
        theme: &str,
        last_played_card: u8,
        utterances: &BTreeMap<String, String>,
        history: &str,
    ) -> Result<QuestionReply, ProviderError>;

    /// One question proposed by a player.
    async fn generate_player_question(
        &self,
        theme: &str,
        last_played_card: u8,
        utterances: &BTreeMap<String, String>,
        my_word: &str,
        history: &str,
    ) -> Result<QuestionReply, ProviderError>;

    /// A short answer to an outstanding question.
    async fn generate_answer(
        &self,
        theme: &str,
        question: &str,
        my_word: &str,
        history: &str,
    ) -> Result<AnswerReply, ProviderError>;
}

/// Explicit provider registry, constructed once by the caller and
/// injected into the engine — no hidden global instance cache.
pub struct ProviderRegistry {
    speaker: Arc<dyn Speaker>,
    estimator: Arc<dyn Estimator>,
    discussion: Arc<dyn Discussion>,
    call_timeout: Duration,
}

impl ProviderRegistry {
    /// Build a registry from explicit role implementations.
    pub fn new(
        speaker: Arc<dyn Speaker>,
        estimator: Arc<dyn Estimator>,
        discussion: Arc<dyn Discussion>,
    ) -> Self {
        Self {
            speaker,
            estimator,
            discussion,
            call_timeout: Duration::from_secs(60),
        }
    }

    /// All-mock registry (no backend configured).
    pub fn mock() -> Self {
        Self::new(
            Arc::new(mock::MockSpeaker),
            Arc::new(mock::MockEstimator),
            Arc::new(mock::MockDiscussion),
        )
    }

    /// Select Live or Mock per configuration: Live when a key is present
    /// and mock is not forced, Mock otherwise.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        if !settings.live_available() {
            tracing::info!("no live backend configured — using mock providers");
            return Self::mock();
        }
        let registry = Self::new(
            Arc::new(live::LiveProvider::for_role(settings, Role::Speaker)),
            Arc::new(live::LiveProvider::for_role(settings, Role::Estimator)),
            Arc::new(live::LiveProvider::for_role(settings, Role::Discussion)),
        );
        registry.with_call_timeout(settings.call_timeout)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| ProviderError::Timeout(self.call_timeout))?
    }

    /// Speaker call with the word="Error" fallback.
    pub async fn word_or_default(&self, theme: &str, number: u8, history: &str) -> WordReply {
        match self
            .bounded(self.speaker.generate_word(theme, number, history))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(role = "speaker", error = %e, "provider failed — using fallback word");
                WordReply {
                    word: "Error".to_string(),
                    reasoning: e.to_string(),
                }
            }
        }
    }

    /// Estimator call with the WAIT fallback.
    pub async fn action_or_default(
        &self,
        theme: &str,
        last_played_card: u8,
        other_utterances: &BTreeMap<String, String>,
        my_number: u8,
        my_word: &str,
        history: &str,
    ) -> ActionReply {
        match self
            .bounded(self.estimator.decide_action(
                theme,
                last_played_card,
                other_utterances,
                my_number,
                my_word,
                history,
            ))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(role = "estimator", error = %e, "provider failed — defaulting to WAIT");
                ActionReply {
                    action: Vote::Wait,
                    thought: e.to_string(),
                }
            }
        }
    }

    /// Moderator question with the fixed fallback string.
    pub async fn question_or_default(
        &self,
        theme: &str,
        last_played_card: u8,
        utterances: &BTreeMap<String, String>,
        history: &str,
    ) -> QuestionReply {
        match self
            .bounded(
                self.discussion
                    .generate_question(theme, last_played_card, utterances, history),
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(role = "discussion", error = %e, "provider failed — using fallback question");
                QuestionReply {
                    question: DEFAULT_MODERATOR_QUESTION.to_string(),
                }
            }
        }
    }

    /// Player question with the fixed fallback string.
    pub async fn player_question_or_default(
        &self,
        theme: &str,
        last_played_card: u8,
        utterances: &BTreeMap<String, String>,
        my_word: &str,
        history: &str,
    ) -> QuestionReply {
        match self
            .bounded(self.discussion.generate_player_question(
                theme,
                last_played_card,
                utterances,
                my_word,
                history,
            ))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(role = "discussion", error = %e, "provider failed — using fallback question");
                QuestionReply {
                    question: DEFAULT_PLAYER_QUESTION.to_string(),
                }
            }
        }
    }

    /// Answer with the fixed fallback string.
    pub async fn answer_or_default(
        &self,
        theme: &str,
        question: &str,
        my_word: &str,
        history: &str,
    ) -> AnswerReply {
        match self
            .bounded(
                self.discussion
                    .generate_answer(theme, question, my_word, history),
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(role = "discussion", error = %e, "provider failed — using fallback answer");
                AnswerReply {
                    answer: DEFAULT_ANSWER.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A provider set that fails every call.
    struct Broken;

    #[async_trait]
    impl Speaker for Broken {
        async fn generate_word(
            &self,
            _theme: &str,
            _number: u8,
            _history: &str,
        ) -> Result<WordReply, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }
    }

    #[async_trait]
    impl Estimator for Broken {
        async fn decide_action(
            &self,
            _theme: &str,
            _last_played_card: u8,
            _other_utterances: &BTreeMap<String, String>,
            _my_number: u8,
            _my_word: &str,
            _history: &str,
        ) -> Result<ActionReply, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }
    }

    #[async_trait]
    impl Discussion for Broken {
        async fn generate_question(
            &self,
            _theme: &str,
            _last_played_card: u8,
            _utterances: &BTreeMap<String, String>,
            _history: &str,
        ) -> Result<QuestionReply, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }

        async fn generate_player_question(
            &self,
            _theme: &str,
            _last_played_card: u8,
            _utterances: &BTreeMap<String, String>,
            _my_word: &str,
            _history: &str,
        ) -> Result<QuestionReply, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }

        async fn generate_answer(
            &self,
            _theme: &str,
            _question: &str,
            _my_word: &str,
            _history: &str,
        ) -> Result<AnswerReply, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }
    }

    fn broken_registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(Broken), Arc::new(Broken), Arc::new(Broken))
    }

    #[tokio::test]
    async fn speaker_failure_maps_to_error_word() {
        let reply = broken_registry().word_or_default("お題", 42, "").await;
        assert_eq!(reply.word, "Error");
        assert!(reply.reasoning.contains("connection refused"));
    }

    #[tokio::test]
    async fn estimator_failure_maps_to_wait() {
        let reply = broken_registry()
            .action_or_default("お題", 0, &BTreeMap::new(), 42, "word", "")
            .await;
        assert_eq!(reply.action, Vote::Wait);
        assert!(reply.thought.contains("connection refused"));
    }

    #[tokio::test]
    async fn discussion_failures_map_to_fixed_strings() {
        let registry = broken_registry();
        let utterances = BTreeMap::new();

        let q = registry
            .question_or_default("お題", 0, &utterances, "")
            .await;
        assert_eq!(q.question, DEFAULT_MODERATOR_QUESTION);

        let pq = registry
            .player_question_or_default("お題", 0, &utterances, "word", "")
            .await;
        assert_eq!(pq.question, DEFAULT_PLAYER_QUESTION);

        let a = registry.answer_or_default("お題", "質問", "word", "").await;
        assert_eq!(a.answer, DEFAULT_ANSWER);
    }

    /// A speaker that never completes; the registry timeout must fire.
    struct Stalled;

    #[async_trait]
    impl Speaker for Stalled {
        async fn generate_word(
            &self,
            _theme: &str,
            _number: u8,
            _history: &str,
        ) -> Result<WordReply, ProviderError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_falls_back_on_timeout() {
        let registry = ProviderRegistry::new(
            Arc::new(Stalled),
            Arc::new(mock::MockEstimator),
            Arc::new(mock::MockDiscussion),
        )
        .with_call_timeout(Duration::from_millis(50));

        let reply = registry.word_or_default("お題", 42, "").await;
        assert_eq!(reply.word, "Error");
        assert!(reply.reasoning.contains("timed out"));
    }
}
