//! Engine and provider configuration.
//!
//! Provider settings are environment-driven with the precedence
//! (highest to lowest):
//!
//! 1. role-specific model override (`ITO_SPEAKER_MODEL`, ...)
//! 2. generic model override (`ITO_MODEL`)
//! 3. backend default (`gpt-4o-mini` / `gemini-2.5-flash-lite`)

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call timeout for live provider requests.
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

const ENV_PROVIDER: &str = "ITO_PROVIDER";
const ENV_MODEL: &str = "ITO_MODEL";
const ENV_FORCE_MOCK: &str = "ITO_FORCE_MOCK";
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_OPENAI_API_BASE: &str = "OPENAI_API_BASE";
const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Placeholder key left by template .env files — treated as absent.
const PLACEHOLDER_KEY: &str = "your-api-key-here";

/// Decision-provider capability roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Speaker,
    Estimator,
    Discussion,
}

impl Role {
    /// Sampling temperature per role (speaker varies, estimator is
    /// deterministic, discussion sits in between).
    pub fn temperature(self) -> f64 {
        match self {
            Role::Speaker => 0.7,
            Role::Estimator => 0.0,
            Role::Discussion => 0.2,
        }
    }

    fn model_env(self) -> &'static str {
        match self {
            Role::Speaker => "ITO_SPEAKER_MODEL",
            Role::Estimator => "ITO_ESTIMATOR_MODEL",
            Role::Discussion => "ITO_DISCUSSION_MODEL",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Speaker => write!(f, "speaker"),
            Role::Estimator => write!(f, "estimator"),
            Role::Discussion => write!(f, "discussion"),
        }
    }
}

/// Supported live backends. Both expose an OpenAI-compatible
/// `chat/completions` surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    OpenAi,
    Gemini,
}

impl Backend {
    pub fn default_model(self) -> &'static str {
        match self {
            Backend::OpenAi => "gpt-4o-mini",
            Backend::Gemini => "gemini-2.5-flash-lite",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Backend::OpenAi => "https://api.openai.com/v1",
            Backend::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

/// Turn-engine construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Participating agents, in turn order.
    pub agent_ids: Vec<String>,
    /// Interactive participant, if any. Must be one of `agent_ids`.
    pub human_agent_id: Option<String>,
    /// Theme; random from the fixed pool when absent.
    pub theme: Option<String>,
    /// Discussion-round budget before forced stagnation failure.
    pub max_turns: u32,
    pub debug: bool,
    pub reveal_hands: bool,
}

impl EngineConfig {
    pub fn new<I, S>(agent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agent_ids: agent_ids.into_iter().map(Into::into).collect(),
            human_agent_id: None,
            theme: None,
            max_turns: 20,
            debug: false,
            reveal_hands: false,
        }
    }

    /// Validate the config; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.agent_ids.is_empty() {
            return Err("at least one agent is required".to_string());
        }
        let unique: HashSet<&String> = self.agent_ids.iter().collect();
        if unique.len() != self.agent_ids.len() {
            return Err("agent ids must be distinct".to_string());
        }
        if self.max_turns == 0 {
            return Err("max_turns must be >= 1".to_string());
        }
        if let Some(human) = &self.human_agent_id {
            if !self.agent_ids.contains(human) {
                return Err(format!("human agent '{human}' is not in the agent list"));
            }
        }
        Ok(())
    }
}

/// Live-backend settings consumed by the provider registry.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub backend: Backend,
    /// Generic model override (role override wins over this).
    pub model: Option<String>,
    pub speaker_model: Option<String>,
    pub estimator_model: Option<String>,
    pub discussion_model: Option<String>,
    /// API key for the selected backend; absent means mock mode.
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible proxies.
    pub base_url: Option<String>,
    pub force_mock: bool,
    pub call_timeout: Duration,
}

impl ProviderSettings {
    /// Build from process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests inject a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = match lookup(ENV_PROVIDER).as_deref().map(str::trim) {
            Some(p) if p.eq_ignore_ascii_case("gemini") => Backend::Gemini,
            _ => Backend::OpenAi,
        };

        let nonempty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let api_key = match backend {
            Backend::OpenAi => nonempty(lookup(ENV_OPENAI_API_KEY)),
            Backend::Gemini => nonempty(lookup(ENV_GOOGLE_API_KEY))
                .or_else(|| nonempty(lookup(ENV_GEMINI_API_KEY)))
                .or_else(|| nonempty(lookup(ENV_OPENAI_API_KEY))),
        }
        .filter(|key| key.as_str() != PLACEHOLDER_KEY);

        Self {
            backend,
            model: nonempty(lookup(ENV_MODEL)),
            speaker_model: nonempty(lookup(Role::Speaker.model_env())),
            estimator_model: nonempty(lookup(Role::Estimator.model_env())),
            discussion_model: nonempty(lookup(Role::Discussion.model_env())),
            api_key,
            base_url: match backend {
                Backend::OpenAi => nonempty(lookup(ENV_OPENAI_API_BASE)),
                Backend::Gemini => None,
            },
            force_mock: is_truthy(lookup(ENV_FORCE_MOCK).as_deref()),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    /// Resolved model name for a role.
    pub fn model_for(&self, role: Role) -> String {
        let role_override = match role {
            Role::Speaker => &self.speaker_model,
            Role::Estimator => &self.estimator_model,
            Role::Discussion => &self.discussion_model,
        };
        role_override
            .clone()
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }

    /// Resolved base URL for the backend.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.backend.default_base_url().to_string())
    }

    /// Whether live providers can be built at all.
    pub fn live_available(&self) -> bool {
        !self.force_mock && self.api_key.is_some()
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}
