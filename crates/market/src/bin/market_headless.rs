//! # Market Headless
//!
//! Runs the simulation without a window and prints a frame and trade
//! summary.
//!
//! ```bash
//! # Defaults
//! ./market_headless
//!
//! # From a config file, with per-partition logs
//! RUST_LOG=debug ./market_headless market.toml
//! ```

use std::process::ExitCode;

use market::{GameLoop, SimulationConfig, SimulationError};
use market::core::TradeState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn run() -> Result<(), SimulationError> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => {
            info!(path = %path.to_string_lossy(), "loading config");
            SimulationConfig::load(path)?
        }
        None => SimulationConfig::default(),
    };

    let frames = config.run.frames;
    let mut game_loop = GameLoop::new(config)?;
    info!(frames, "running headless");

    game_loop.run(frames).print_summary();

    let ledger = game_loop.trade_ledger();
    let census = game_loop.goods_census();
    println!();
    println!("┌─ MARKET ─────────────────────────────────────────────────────────┐");
    println!("│ Trades:             {}", ledger.trades);
    for state in TradeState::ALL {
        println!(
            "│ {:<18}  npcs got {:>6}  rugs got {:>6}  held {:>5}",
            state.name(),
            ledger.npc_received(state),
            ledger.rug_received(state),
            census[usize::from(state.as_u8())]
        );
    }
    println!("└──────────────────────────────────────────────────────────────────┘");

    Ok(())
}
