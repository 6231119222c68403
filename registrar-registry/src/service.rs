//! Registry operations: register, deregister, list, get, discover, health checks

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use registrar_core::models::{
    DiscoverResponse, HealthReport, RegisterRequest, RegistryStatus, ServiceDescriptor,
    ServiceStatus,
};
use registrar_core::{Error, Result};

use super::probe::HealthProbe;
use super::store::ServiceStore;

/// The registry's request-facing operations over a shared [`ServiceStore`]
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<ServiceStore>,
    probe: Arc<dyn HealthProbe>,
    default_health_path: String,
    started_at: Instant,
}

impl RegistryService {
    #[must_use]
    pub fn new(
        store: Arc<ServiceStore>,
        probe: Arc<dyn HealthProbe>,
        default_health_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            probe,
            default_health_path: default_health_path.into(),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ServiceStore> {
        &self.store
    }

    /// Insert or replace the descriptor for `request.name`.
    ///
    /// Re-registering an existing name silently replaces it, even when the new
    /// address belongs to an unrelated instance (last write wins).
    pub fn register(&self, request: &RegisterRequest) -> Result<ServiceDescriptor> {
        let registration = request.validate(&self.default_health_path)?;
        let descriptor = ServiceDescriptor::new(registration, Utc::now());

        match self.store.upsert(descriptor.clone()) {
            Some(previous) if previous.url != descriptor.url => {
                tracing::warn!(
                    service = %descriptor.name,
                    previous_url = %previous.url,
                    url = %descriptor.url,
                    "Service re-registered with a different address, replacing previous registration"
                );
            }
            Some(_) => {
                tracing::info!(service = %descriptor.name, url = %descriptor.url, "Service re-registered");
            }
            None => {
                tracing::info!(
                    service = %descriptor.name,
                    url = %descriptor.url,
                    health_endpoint = %descriptor.health_endpoint,
                    "Service registered"
                );
            }
        }

        Ok(descriptor)
    }

    pub fn deregister(&self, name: &str) -> Result<()> {
        match self.store.remove(name) {
            Some(_) => {
                tracing::info!(service = %name, "Service deregistered");
                Ok(())
            }
            None => Err(not_found(name)),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<ServiceDescriptor> {
        self.store.snapshot()
    }

    pub fn get(&self, name: &str) -> Result<ServiceDescriptor> {
        self.store.get(name).ok_or_else(|| not_found(name))
    }

    /// Resolve a name to its address.
    ///
    /// `NotFound` when never registered (or evicted), `Unavailable` when
    /// registered but currently unhealthy.
    pub fn discover(&self, name: &str) -> Result<DiscoverResponse> {
        let descriptor = self.get(name)?;

        if descriptor.status == ServiceStatus::Unhealthy {
            return Err(Error::Unavailable(format!(
                "Service '{name}' is registered but unhealthy ({} consecutive failures)",
                descriptor.consecutive_failures
            )));
        }

        Ok(DiscoverResponse::from(&descriptor))
    }

    /// Poll the service right now, outside the periodic cycle.
    ///
    /// The result is returned as-is and never written back to the store.
    pub async fn check_health(&self, name: &str) -> Result<HealthReport> {
        let descriptor = self.get(name)?;
        let outcome = self.probe.probe(&descriptor.health_url()).await;

        Ok(HealthReport {
            service: descriptor.name,
            status: if outcome.healthy {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Unhealthy
            },
            healthy: outcome.healthy,
            last_check: Utc::now(),
            details: outcome.details,
        })
    }

    #[must_use]
    pub fn self_status(&self) -> RegistryStatus {
        RegistryStatus {
            status: "ok".to_string(),
            registered_services: self.store.len(),
            uptime: self.started_at.elapsed().as_secs(),
        }
    }
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("Service '{name}' not found"))
}
