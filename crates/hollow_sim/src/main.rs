//! Hollow arena simulation
//!
//! Run with: cargo run -p hollow_sim -- [scenario.toml]
//!
//! Without an argument the `HOLLOW_SCENARIO` environment variable is
//! used, then the built-in arena.

use hollow_sim::scenario::{self, SCENARIO_ENV};
use hollow_sim::{Arena, Result, Scenario};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let source = scenario::locate(std::env::args().skip(1), std::env::var(SCENARIO_ENV).ok());
    let scenario = match &source {
        Some(path) => {
            log::info!("Loading scenario from {}", path.display());
            Scenario::load(path)?
        }
        None => {
            log::info!("No scenario given, running the built-in arena");
            Scenario::builtin()?
        }
    };

    log::info!(
        "Running '{}' for {:.1}s at {} Hz",
        scenario.name,
        scenario.duration,
        scenario.tick_rate
    );

    let summary = Arena::new(&scenario)?.run();

    println!();
    print!("{}", summary);
    Ok(())
}
