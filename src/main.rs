use anyhow::Result;
use clap::Parser;
use tracing::info;

use ito_engine::human::ConsoleTransport;
use ito_engine::{EngineConfig, ProviderRegistry, ProviderSettings, TurnEngine};

/// Run one game of Ito with LLM-backed (or mock) players.
#[derive(Debug, Parser)]
#[command(name = "ito-engine", version, about)]
struct Cli {
    /// Comma-separated agent ids, in turn order.
    #[arg(long, value_delimiter = ',', default_value = "Alice,Bob,Charlie")]
    agents: Vec<String>,

    /// Agent id controlled interactively from the console.
    #[arg(long)]
    human: Option<String>,

    /// Theme override (random from the fixed pool when omitted).
    #[arg(long)]
    theme: Option<String>,

    /// Discussion rounds allowed before the game fails by stagnation.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    max_turns: u32,

    /// Verbose provider rationale logging.
    #[arg(long)]
    debug: bool,

    /// Log every agent's secret card (debugging).
    #[arg(long)]
    reveal: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig {
        agent_ids: cli.agents,
        human_agent_id: cli.human,
        theme: cli.theme,
        max_turns: cli.max_turns,
        debug: cli.debug,
        reveal_hands: cli.reveal,
    };

    let registry = ProviderRegistry::from_settings(&ProviderSettings::from_env());
    let mut engine = TurnEngine::new(config.clone(), registry);
    if config.human_agent_id.is_some() {
        engine = engine.with_human(Box::new(ConsoleTransport));
    }

    // Print each phase's new history lines as the game progresses.
    let mut printed = 0usize;
    let mut on_phase = |phase: ito_engine::Phase, state: &ito_engine::GameState| {
        for line in &state.history[printed.min(state.history.len())..] {
            println!("{line}");
        }
        printed = state.history.len();
        info!(phase = %phase, status = %state.status, "phase complete");
    };

    let state = engine.run(None, Some(&mut on_phase)).await?;

    println!();
    println!("Status: {}", state.status);
    println!(
        "Played cards: {:?} ({}/{} agents)",
        state.played_cards,
        state.finished_agents.len(),
        state.agents.len()
    );
    Ok(())
}
