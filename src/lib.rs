//! ito-engine — turn engine for the cooperative Ito card game.
//!
//! Each agent secretly holds one card (1–100) and the table must reveal
//! all cards in strictly ascending order using only indirect verbal
//! clues. This crate owns the phase state machine (speaking, voting,
//! play resolution, deadlock-breaking discussion, termination) and
//! treats clue/vote generation as injected decision providers, either
//! LLM-backed or deterministic mocks.

pub mod config;
pub mod deck;
pub mod decode;
pub mod engine;
pub mod human;
pub mod phase;
pub mod prompts;
pub mod providers;
pub mod state;

pub use config::{Backend, EngineConfig, ProviderSettings, Role};
pub use engine::{EngineError, TurnEngine};
pub use phase::Phase;
pub use providers::ProviderRegistry;
pub use state::{GameState, GameStatus, Vote};
