//! Form schema registry CLI
//!
//! Manages versioned form schemas in the configured store and resolves
//! repeatable entries onto physical form field names.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/formschema-cli
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` overrides the configured level.

mod args;
mod commands;
mod router;

use anyhow::Context;
use clap::Parser;
use formschema_core::{LoggingConfig, RegistryConfig};
use tracing_subscriber::EnvFilter;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = RegistryConfig::load(Some(cli.config.as_path()))
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    init_logging(&config.logging, cli.verbose);

    router::route(cli, config).await
}

/// Initialize logging with environment-based filtering
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}
