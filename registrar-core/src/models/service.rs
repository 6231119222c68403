//! Service descriptor and the JSON shapes exchanged with the registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Health path used when a registration omits one
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Health state of a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

impl ServiceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Unhealthy => "UNHEALTHY",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration request as sent by a service instance.
///
/// Every field is optional on the wire so that a missing field surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_endpoint: Option<String>,
}

impl RegisterRequest {
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: Some(name.into()),
            host: Some(host.into()),
            port: Some(port),
            health_endpoint: None,
        }
    }

    #[must_use]
    pub fn with_health_endpoint(mut self, path: impl Into<String>) -> Self {
        self.health_endpoint = Some(path.into());
        self
    }

    /// Validate the request and normalize it into a [`ServiceRegistration`].
    pub fn validate(&self, default_health_path: &str) -> Result<ServiceRegistration> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Validation("name is required".to_string()))?;

        if name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(Error::Validation(format!(
                "name '{name}' must not contain '/' or whitespace"
            )));
        }

        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Validation("host is required".to_string()))?;

        let port = match self.port {
            Some(0) => return Err(Error::Validation("port must be between 1 and 65535".to_string())),
            Some(port) => port,
            None => return Err(Error::Validation("port is required".to_string())),
        };

        let health_path = normalize_health_path(
            self.health_endpoint
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(default_health_path),
        );

        Ok(ServiceRegistration {
            name: name.to_string(),
            host: host.to_string(),
            port,
            health_path,
        })
    }
}

/// A validated registration, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub health_path: String,
}

impl ServiceRegistration {
    #[must_use]
    pub fn base_url(&self) -> String {
        base_url(&self.host, self.port)
    }
}

/// The registry's record for one logical service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub url: String,
    pub health_endpoint: String,
    pub status: ServiceStatus,
    pub consecutive_failures: u32,
    pub registered_at: DateTime<Utc>,
    pub last_health_check: Option<DateTime<Utc>>,
}

impl ServiceDescriptor {
    /// Build a fresh descriptor: healthy, no failures, registered at `now`.
    #[must_use]
    pub fn new(registration: ServiceRegistration, now: DateTime<Utc>) -> Self {
        let url = registration.base_url();
        Self {
            name: registration.name,
            host: registration.host,
            port: registration.port,
            url,
            health_endpoint: registration.health_path,
            status: ServiceStatus::Healthy,
            consecutive_failures: 0,
            registered_at: now,
            last_health_check: None,
        }
    }

    /// Full URL polled by the health monitor
    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}{}", self.url, self.health_endpoint)
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

/// `GET /discover/{name}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub name: String,
    pub url: String,
    pub host: String,
    pub port: u16,
    pub status: ServiceStatus,
}

impl From<&ServiceDescriptor> for DiscoverResponse {
    fn from(descriptor: &ServiceDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            url: descriptor.url.clone(),
            host: descriptor.host.clone(),
            port: descriptor.port,
            status: descriptor.status,
        }
    }
}

/// Result details of a single health poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// `GET /health/{name}` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub service: String,
    pub status: ServiceStatus,
    pub healthy: bool,
    pub last_check: DateTime<Utc>,
    pub details: ProbeDetails,
}

/// `GET /services` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceList {
    pub count: usize,
    pub services: Vec<ServiceDescriptor>,
}

impl From<Vec<ServiceDescriptor>> for ServiceList {
    fn from(services: Vec<ServiceDescriptor>) -> Self {
        Self {
            count: services.len(),
            services,
        }
    }
}

/// `POST /register` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub service: ServiceDescriptor,
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /health` response: the registry's own liveness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    pub status: String,
    pub registered_services: usize,
    /// Seconds since the registry process started
    pub uptime: u64,
}

/// Combine host and port into a base URL, bracketing IPv6 literals.
#[must_use]
pub fn base_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

fn normalize_health_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
