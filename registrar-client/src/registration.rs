//! Startup self-registration with a fixed-delay retry (via `backon` crate)
//!
//! A service should never refuse to start because the registry is slow to
//! come up, so exhausting the attempts is logged and returned, not fatal.

use backon::{BackoffBuilder, ConstantBuilder};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use registrar_core::config::RegistrationConfig;
use registrar_core::models::{RegisterRequest, ServiceDescriptor};
use registrar_core::{Error, Result};

use crate::registry_client::RegistryClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RegistrationConfig::default())
    }
}

impl From<&RegistrationConfig> for RetryPolicy {
    fn from(config: &RegistrationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(retries)
            .build()
    }
}

/// Register `request`, retrying transport failures and 503s per `policy`.
///
/// Validation errors are returned on the first attempt.
pub async fn register_with_retry(
    client: &RegistryClient,
    request: &RegisterRequest,
    policy: &RetryPolicy,
) -> Result<ServiceDescriptor> {
    let name = request.name.as_deref().unwrap_or_default();
    let mut last_err = None;
    let mut attempt = 0u32;

    for delay in std::iter::once(Duration::ZERO).chain(policy.backoff()) {
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;

        match client.register(request).await {
            Ok(descriptor) => {
                info!(
                    service = %descriptor.name,
                    url = %descriptor.url,
                    attempt,
                    "Registered with service registry"
                );
                return Ok(descriptor);
            }
            Err(e) if e.is_transient() => {
                warn!(
                    service = %name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Registration attempt failed"
                );
                last_err = Some(e);
            }
            Err(e) => {
                warn!(service = %name, error = %e, "Registration rejected, not retrying");
                return Err(e);
            }
        }
    }

    warn!(
        service = %name,
        attempts = attempt,
        "Giving up on registration, continuing without it"
    );
    Err(last_err.unwrap_or_else(|| Error::Internal("No registration attempt was made".into())))
}

/// Run [`register_with_retry`] on a background task so startup is not blocked.
pub fn spawn_self_registration(
    client: RegistryClient,
    request: RegisterRequest,
    policy: RetryPolicy,
) -> JoinHandle<Result<ServiceDescriptor>> {
    tokio::spawn(async move { register_with_retry(&client, &request, &policy).await })
}
