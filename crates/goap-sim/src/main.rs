//! Simulation runner binary: loads configuration, bootstraps the world
//! store, domain systems, and actor hosts, runs until its configured bound
//! (or forever), then shuts down cleanly and optionally saves.

mod bootstrap;
mod config;
mod demo_planner;
mod error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bootstrap::Simulation;
use crate::config::SimConfig;

const DEFAULT_CONFIG_PATH: &str = "goap-sim.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration fails to load, any subsystem fails to
/// initialize, or an actor host's thread panics.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("goap-sim starting");

    let config = SimConfig::load(DEFAULT_CONFIG_PATH)?;
    info!(
        actor_count = config.actors.ids.len(),
        width = config.world.width,
        height = config.world.height,
        "configuration loaded"
    );

    let simulation = Simulation::bootstrap(config)?;
    info!("simulation bootstrapped");
    simulation.run()?;
    info!("goap-sim exiting");
    Ok(())
}
