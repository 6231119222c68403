//! Periodic health monitoring of registered services
//!
//! One sweep polls every registered descriptor concurrently and feeds each
//! result into the store's per-descriptor state machine:
//! HEALTHY <-> UNHEALTHY on single results, removal after `failure_threshold`
//! consecutive failures.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::probe::HealthProbe;
use super::store::{ProbeTransition, ServiceStore};

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub evicted: usize,
    /// Results discarded because the descriptor changed mid-poll
    pub stale: usize,
}

/// Health monitor for registered services
pub struct HealthMonitor {
    store: Arc<ServiceStore>,
    probe: Arc<dyn HealthProbe>,
    interval: Duration,
    failure_threshold: u32,
    cancel_token: CancellationToken,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(
        store: Arc<ServiceStore>,
        probe: Arc<dyn HealthProbe>,
        interval: Duration,
        failure_threshold: u32,
    ) -> Self {
        Self {
            store,
            probe,
            interval,
            failure_threshold: failure_threshold.max(1),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Start the monitoring loop.
    ///
    /// The first sweep runs one full interval after start. Returns the
    /// `JoinHandle` so the caller can await completion after `shutdown()`.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        let cancel_token = self.cancel_token.clone();

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            failure_threshold = self.failure_threshold,
            "Health monitor started"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        tracing::info!("Health monitor shutting down");
                        return;
                    }
                    _ = timer.tick() => {
                        monitor.sweep().await;
                    }
                }
            }
        })
    }

    /// Run one full sweep over the current descriptor set.
    pub async fn sweep(&self) -> SweepReport {
        let targets = self.store.probe_targets();
        if targets.is_empty() {
            tracing::debug!("No registered services to check");
            return SweepReport::default();
        }

        let outcomes = join_all(
            targets
                .iter()
                .map(|target| self.probe.probe(&target.health_url)),
        )
        .await;

        let mut report = SweepReport {
            checked: targets.len(),
            ..SweepReport::default()
        };

        for (target, outcome) in targets.iter().zip(outcomes) {
            let transition =
                self.store
                    .record_probe(target, outcome.healthy, Utc::now(), self.failure_threshold);

            match transition {
                ProbeTransition::Healthy { recovered } => {
                    report.healthy += 1;
                    if recovered {
                        tracing::info!(service = %target.name, "Service recovered");
                    }
                }
                ProbeTransition::Unhealthy {
                    consecutive_failures,
                } => {
                    report.unhealthy += 1;
                    tracing::warn!(
                        service = %target.name,
                        consecutive_failures,
                        failure_threshold = self.failure_threshold,
                        error = ?outcome.details.error,
                        "Health check failed"
                    );
                }
                ProbeTransition::Evicted {
                    consecutive_failures,
                } => {
                    report.evicted += 1;
                    tracing::warn!(
                        service = %target.name,
                        consecutive_failures,
                        "Service evicted after consecutive health check failures"
                    );
                }
                ProbeTransition::Stale => {
                    report.stale += 1;
                    tracing::debug!(
                        service = %target.name,
                        "Discarding health result for replaced or removed registration"
                    );
                }
            }
        }

        tracing::debug!(
            checked = report.checked,
            healthy = report.healthy,
            unhealthy = report.unhealthy,
            evicted = report.evicted,
            "Health sweep completed"
        );

        report
    }

    /// Gracefully shut down the monitoring loop
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub const fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }
}
