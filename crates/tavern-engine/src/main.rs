//! Driving-loop binary for the tavern simulation.
//!
//! Wires the memory store, economy, and narrative engine together and runs
//! the tick loop until the configured number of ticks has elapsed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument, or
//!    `tavern-config.yaml` in the working directory
//! 2. Initialize structured logging (tracing)
//! 3. Select the text generator from `LLM_*` environment variables
//! 4. Build the components and register the roster
//! 5. Restore the memory snapshot if one exists
//! 6. Run the tick loop, snapshotting periodically and at shutdown

mod error;
mod gateway;
mod tavern;

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use tavern_narrative::{LoggingConfig, TavernConfig};

use crate::error::EngineError;
use crate::gateway::Gateway;
use crate::tavern::Tavern;

/// Config file used when no path is given.
const DEFAULT_CONFIG_PATH: &str = "tavern-config.yaml";

/// Application entry point for the tavern engine.
///
/// # Errors
///
/// Returns an error if configuration, wiring, snapshot restore, or the
/// final snapshot fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, loaded_from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("tavern-engine starting");
    if loaded_from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        tavern = %config.tavern.name,
        seed = ?config.tavern.seed,
        agents = config.agents.len(),
        ticks = config.simulation.ticks,
        tick_interval_ms = config.simulation.tick_interval_ms,
        "Simulation configured"
    );

    // 3. Select the text generator.
    let gateway = Gateway::from_env(&config.llm).map_err(EngineError::from)?;

    // 4-5. Build components and restore memory.
    let mut tavern = Tavern::build(config, gateway)?;
    tavern.restore().await?;

    // 6. Run.
    let summary = tavern.run().await?;
    info!(
        ticks = summary.ticks,
        events = summary.events,
        quests_completed = summary.quests_completed,
        tension = summary.final_tension.level(),
        snapshot = %summary.snapshot_path.display(),
        "tavern-engine shutdown complete"
    );
    Ok(())
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist. The flag reports whether the file was read.
fn load_config(path: &Path) -> Result<(TavernConfig, bool), EngineError> {
    if path.exists() {
        Ok((TavernConfig::from_file(path)?, true))
    } else {
        Ok((TavernConfig::default(), false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
