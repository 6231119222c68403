//! In-memory registration store
//!
//! Owns every [`ServiceDescriptor`]. All mutations go through a single coarse
//! lock that is never held across an `.await`; callers only ever see clones.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use registrar_core::models::{ServiceDescriptor, ServiceStatus};

#[derive(Debug)]
struct Entry {
    /// Bumped on every (re-)registration so in-flight polls can detect replacement
    revision: u64,
    descriptor: ServiceDescriptor,
}

/// A descriptor captured for one health poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub name: String,
    pub health_url: String,
    pub revision: u64,
}

/// What a recorded poll did to the stored descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTransition {
    /// Poll succeeded; `recovered` is true when the service was unhealthy before
    Healthy { recovered: bool },
    /// Poll failed below the eviction threshold
    Unhealthy { consecutive_failures: u32 },
    /// Poll failed and the threshold was reached; the descriptor is gone
    Evicted { consecutive_failures: u32 },
    /// The descriptor was replaced or removed while the poll was in flight
    Stale,
}

#[derive(Debug, Default)]
pub struct ServiceStore {
    entries: RwLock<HashMap<String, Entry>>,
    next_revision: AtomicU64,
}

impl ServiceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the descriptor for its name (last writer wins).
    ///
    /// Returns the descriptor that was replaced, if any.
    pub fn upsert(&self, descriptor: ServiceDescriptor) -> Option<ServiceDescriptor> {
        let revision = self.next_revision.fetch_add(1, Ordering::Relaxed) + 1;
        let mut entries = self.entries.write();
        entries
            .insert(
                descriptor.name.clone(),
                Entry {
                    revision,
                    descriptor,
                },
            )
            .map(|previous| previous.descriptor)
    }

    pub fn remove(&self, name: &str) -> Option<ServiceDescriptor> {
        self.entries.write().remove(name).map(|entry| entry.descriptor)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ServiceDescriptor> {
        self.entries
            .read()
            .get(name)
            .map(|entry| entry.descriptor.clone())
    }

    /// Consistent copy of every descriptor, sorted by name
    #[must_use]
    pub fn snapshot(&self) -> Vec<ServiceDescriptor> {
        let mut descriptors: Vec<_> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Capture what the health monitor needs to poll, without holding the lock afterwards
    #[must_use]
    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.entries
            .read()
            .iter()
            .map(|(name, entry)| ProbeTarget {
                name: name.clone(),
                health_url: entry.descriptor.health_url(),
                revision: entry.revision,
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Apply one poll result to the descriptor it was taken from.
    ///
    /// Evicts the descriptor once `consecutive_failures` reaches `failure_threshold`.
    pub fn record_probe(
        &self,
        target: &ProbeTarget,
        healthy: bool,
        checked_at: DateTime<Utc>,
        failure_threshold: u32,
    ) -> ProbeTransition {
        let mut entries = self.entries.write();

        let Some(entry) = entries
            .get_mut(&target.name)
            .filter(|entry| entry.revision == target.revision)
        else {
            return ProbeTransition::Stale;
        };

        let descriptor = &mut entry.descriptor;
        descriptor.last_health_check = Some(checked_at);

        if healthy {
            let recovered = descriptor.status == ServiceStatus::Unhealthy;
            descriptor.status = ServiceStatus::Healthy;
            descriptor.consecutive_failures = 0;
            return ProbeTransition::Healthy { recovered };
        }

        descriptor.consecutive_failures = descriptor.consecutive_failures.saturating_add(1);
        let consecutive_failures = descriptor.consecutive_failures;

        if consecutive_failures >= failure_threshold {
            entries.remove(&target.name);
            ProbeTransition::Evicted {
                consecutive_failures,
            }
        } else {
            descriptor.status = ServiceStatus::Unhealthy;
            ProbeTransition::Unhealthy {
                consecutive_failures,
            }
        }
    }
}
