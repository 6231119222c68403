use anyhow::Result;
use clap::Parser;
use tracing::info;

use registrar::bootstrap::load_config;
use registrar::cli::{self, Cli, Command};
use registrar::RegistryServer;
use registrar_core::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    match args.command() {
        Command::Serve => {
            info!("Service registry starting...");
            info!("HTTP address: {}", config.http_address());

            let server = RegistryServer::new(config)?;
            server.start().await?;

            info!("Service registry stopped");
        }
        Command::Resolve { name } => cli::resolve(&config, &name).await?,
        Command::Register {
            name,
            host,
            port,
            health_endpoint,
        } => cli::register(&config, name, host, port, health_endpoint).await?,
        Command::Deregister { name } => cli::deregister(&config, &name).await?,
    }

    Ok(())
}
