//! Live providers backed by an OpenAI-compatible chat-completions API.
//!
//! One `LiveProvider` is built per role, carrying that role's resolved
//! model name and sampling temperature. The prompt asks for a single
//! JSON object; the reply text goes through [`crate::decode`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{ProviderSettings, Role};
use crate::decode::{decode_object, str_field};
use crate::prompts::{
    self, DISCUSSION_ANSWER_PROMPT, DISCUSSION_PLAYER_QUESTION_PROMPT, DISCUSSION_QUESTION_PROMPT,
    ESTIMATOR_PROMPT, SPEAKER_PROMPT,
};
use crate::state::Vote;

use super::{
    ActionReply, AnswerReply, Discussion, Estimator, ProviderError, QuestionReply, Speaker,
    WordReply,
};

pub struct LiveProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl LiveProvider {
    /// Build the provider for one role from resolved settings.
    ///
    /// Callers check `settings.live_available()` first; an absent key
    /// here degrades to requests that fail and get absorbed upstream.
    pub fn for_role(settings: &ProviderSettings, role: Role) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.resolved_base_url(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            model: settings.model_for(role),
            temperature: role.temperature(),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        })
    }

    /// Send one chat-completion request and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Request(format!(
                "{url} returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Request("response carried no message content".into()))
    }

    async fn question_from(
        &self,
        template: &str,
        vars: &[(&str, &str)],
        fallback: &str,
    ) -> Result<QuestionReply, ProviderError> {
        let text = self.complete(&prompts::fill(template, vars)).await?;
        let map = decode_object(&text)?;
        let question = str_field(&map, "question")
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Ok(QuestionReply { question })
    }
}

#[async_trait]
impl Speaker for LiveProvider {
    async fn generate_word(
        &self,
        theme: &str,
        number: u8,
        history: &str,
    ) -> Result<WordReply, ProviderError> {
        let prompt = prompts::fill(
            SPEAKER_PROMPT,
            &[
                ("theme", theme),
                ("number", &number.to_string()),
                ("history", history),
            ],
        );
        let map = decode_object(&self.complete(&prompt).await?)?;
        Ok(WordReply {
            word: str_field(&map, "word").unwrap_or_else(|| "Error".to_string()),
            reasoning: str_field(&map, "reasoning").unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Estimator for LiveProvider {
    async fn decide_action(
        &self,
        theme: &str,
        last_played_card: u8,
        other_utterances: &BTreeMap<String, String>,
        my_number: u8,
        my_word: &str,
        history: &str,
    ) -> Result<ActionReply, ProviderError> {
        let prompt = prompts::fill(
            ESTIMATOR_PROMPT,
            &[
                ("theme", theme),
                ("last_played_card", &last_played_card.to_string()),
                ("my_number", &my_number.to_string()),
                ("my_word", my_word),
                ("utterances", &prompts::utterance_table(other_utterances)),
                ("history", history),
            ],
        );
        let map = decode_object(&self.complete(&prompt).await?)?;
        // Anything that is not exactly PLAY normalizes to WAIT.
        let action = Vote::from_text(&str_field(&map, "action").unwrap_or_default());
        Ok(ActionReply {
            action,
            thought: str_field(&map, "thought").unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Discussion for LiveProvider {
    async fn generate_question(
        &self,
        theme: &str,
        last_played_card: u8,
        utterances: &BTreeMap<String, String>,
        history: &str,
    ) -> Result<QuestionReply, ProviderError> {
        self.question_from(
            DISCUSSION_QUESTION_PROMPT,
            &[
                ("theme", theme),
                ("last_played_card", &last_played_card.to_string()),
                ("utterances", &prompts::utterance_table(utterances)),
                ("history", history),
            ],
            prompts::DEFAULT_MODERATOR_QUESTION,
        )
        .await
    }

    async fn generate_player_question(
        &self,
        theme: &str,
        last_played_card: u8,
        utterances: &BTreeMap<String, String>,
        my_word: &str,
        history: &str,
    ) -> Result<QuestionReply, ProviderError> {
        self.question_from(
            DISCUSSION_PLAYER_QUESTION_PROMPT,
            &[
                ("theme", theme),
                ("last_played_card", &last_played_card.to_string()),
                ("utterances", &prompts::utterance_table(utterances)),
                ("my_word", my_word),
                ("history", history),
            ],
            prompts::DEFAULT_PLAYER_QUESTION,
        )
        .await
    }

    async fn generate_answer(
        &self,
        theme: &str,
        question: &str,
        my_word: &str,
        history: &str,
    ) -> Result<AnswerReply, ProviderError> {
        let prompt = prompts::fill(
            DISCUSSION_ANSWER_PROMPT,
            &[
                ("theme", theme),
                ("question", question),
                ("my_word", my_word),
                ("history", history),
            ],
        );
        let map = decode_object(&self.complete(&prompt).await?)?;
        let answer = str_field(&map, "answer")
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| prompts::DEFAULT_ANSWER.to_string());
        Ok(AnswerReply { answer })
    }
}
