use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::models::DEFAULT_HEALTH_PATH;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub health: HealthCheckConfig,
    pub discovery: DiscoveryConfig,
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Periodic health polling of registered services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Seconds between two sweeps
    pub interval_seconds: u64,
    /// Per-poll timeout
    pub timeout_seconds: u64,
    /// Consecutive failed polls before a service is evicted
    pub failure_threshold: u32,
    /// Health path assumed when a registration omits one
    pub default_health_path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            timeout_seconds: 5,
            failure_threshold: 3,
            default_health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

impl HealthCheckConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Caller-side discovery: where the registry lives and how long to trust answers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub registry_url: String,
    pub cache_ttl_seconds: u64,
    pub timeout_seconds: u64,
    /// Static name -> base URL table used when the registry cannot answer
    pub fallback: HashMap<String, String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://localhost:3001".to_string(),
            cache_ttl_seconds: 30,
            timeout_seconds: 3,
            fallback: HashMap::new(),
        }
    }
}

impl DiscoveryConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Startup self-registration retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay_ms: 5000,
            timeout_seconds: 5,
        }
    }
}

impl RegistrationConfig {
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // REGISTRAR_HEALTH__INTERVAL_SECONDS=10, REGISTRAR_DISCOVERY__FALLBACK__TICKETS=...
        builder = builder.add_source(
            Environment::with_prefix("REGISTRAR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Collect every configuration problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            errors.push(format!("logging.level '{}' is not a valid level", self.logging.level));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }

        if self.health.interval_seconds == 0 {
            errors.push("health.interval_seconds must be greater than 0".to_string());
        }
        if self.health.timeout_seconds == 0 {
            errors.push("health.timeout_seconds must be greater than 0".to_string());
        }
        if self.health.failure_threshold == 0 {
            errors.push("health.failure_threshold must be at least 1".to_string());
        }

        if let Err(e) = url::Url::parse(&self.discovery.registry_url) {
            errors.push(format!(
                "discovery.registry_url '{}' is not a valid URL: {e}",
                self.discovery.registry_url
            ));
        }
        if self.discovery.cache_ttl_seconds == 0 {
            errors.push("discovery.cache_ttl_seconds must be greater than 0".to_string());
        }
        if self.discovery.timeout_seconds == 0 {
            errors.push("discovery.timeout_seconds must be greater than 0".to_string());
        }
        for (name, address) in &self.discovery.fallback {
            if let Err(e) = url::Url::parse(address) {
                errors.push(format!("discovery.fallback.{name} '{address}' is not a valid URL: {e}"));
            }
        }

        if self.registration.max_attempts == 0 {
            errors.push("registration.max_attempts must be at least 1".to_string());
        }
        if self.registration.timeout_seconds == 0 {
            errors.push("registration.timeout_seconds must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get HTTP listen address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
