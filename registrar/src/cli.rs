//! Command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};

use registrar_client::{
    register_with_retry, DiscoveryClient, RegistryClient, ResolutionSource, RetryPolicy,
};
use registrar_core::models::RegisterRequest;
use registrar_core::Config;

#[derive(Parser, Debug)]
#[command(name = "registrar")]
#[command(about = "Service registry and discovery", long_about = None)]
pub struct Cli {
    /// Path to a YAML/TOML/JSON config file
    #[arg(long, global = true, env = "REGISTRAR_CONFIG_PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the registry HTTP server and health monitor (default)
    Serve,

    /// Resolve a service name through the registry, falling back to the static table
    Resolve {
        name: String,
    },

    /// Register a service instance with the configured registry
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        host: String,

        #[arg(long)]
        port: u16,

        /// Health path polled by the registry (defaults to /health)
        #[arg(long)]
        health_endpoint: Option<String>,
    },

    /// Remove a service from the configured registry
    Deregister {
        name: String,
    },
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

pub async fn resolve(config: &Config, name: &str) -> Result<()> {
    let discovery = DiscoveryClient::from_config(&config.discovery)?;
    let resolution = discovery.resolve(name).await?;

    let source = match resolution.source {
        ResolutionSource::Cache | ResolutionSource::Registry => "registry",
        ResolutionSource::Fallback => "fallback",
    };
    println!("{name} -> {} ({source})", resolution.url);
    Ok(())
}

pub async fn register(
    config: &Config,
    name: String,
    host: String,
    port: u16,
    health_endpoint: Option<String>,
) -> Result<()> {
    let client = RegistryClient::new(&config.discovery.registry_url, config.registration.timeout())?;

    let mut request = RegisterRequest::new(name, host, port);
    if let Some(path) = health_endpoint {
        request = request.with_health_endpoint(path);
    }

    let policy = RetryPolicy::from(&config.registration);
    let descriptor = register_with_retry(&client, &request, &policy).await?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

pub async fn deregister(config: &Config, name: &str) -> Result<()> {
    let client = RegistryClient::new(&config.discovery.registry_url, config.registration.timeout())?;
    client.deregister(name).await?;
    println!("Service {name} deregistered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["registrar"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "registrar",
            "register",
            "--name",
            "tickets",
            "--host",
            "tickets",
            "--port",
            "3002",
            "--health-endpoint",
            "/ready",
        ])
        .unwrap();

        assert_eq!(
            cli.command(),
            Command::Register {
                name: "tickets".into(),
                host: "tickets".into(),
                port: 3002,
                health_endpoint: Some("/ready".into()),
            }
        );
    }

    #[test]
    fn test_parse_global_config_flag() {
        let cli =
            Cli::try_parse_from(["registrar", "resolve", "users", "--config", "/etc/registrar.yaml"])
                .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/registrar.yaml"));
        assert_eq!(cli.command(), Command::Resolve { name: "users".into() });
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from([
            "registrar", "register", "--name", "a", "--host", "h", "--port", "70000"
        ])
        .is_err());
    }
}
