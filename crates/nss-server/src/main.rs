//! # NSS Gateway
//!
//! Main entry point for the NSS gateway server.

#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use nss_server::{init_tracing, GatewayConfig, Server};

/// Serves LDAP accounts, groups and shadow data over HTTP.
#[derive(Debug, Parser)]
#[command(name = "nss-gateway", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "NSS_GATEWAY_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = GatewayConfig::load(&cli.config)?;

    if cli.check_config {
        println!("{}: configuration OK", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.logging);
    tracing::info!(config = %cli.config.display(), "NSS gateway starting...");

    Server::new(config)?.run().await
}
