//! DeCAI simulation binary
//!
//! Usage: `decai-sim [CONFIG_FILE]`. Prints the report as JSON on stdout;
//! logs go to stderr, filtered by `RUST_LOG` (default `info`).

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use decai_simulation::{SimulationConfig, Simulator};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting DeCAI simulation v{}", decai_common::VERSION);

    let path = std::env::args().nth(1);
    let config = SimulationConfig::load(path.as_deref())?;
    info!(
        mechanism = config.mechanism.kind(),
        agents = config.agents.len(),
        duration_s = config.duration_s,
        "Loaded configuration"
    );

    let report = Simulator::new(config)?.run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.conserved {
        anyhow::bail!("value was not conserved");
    }
    Ok(())
}
