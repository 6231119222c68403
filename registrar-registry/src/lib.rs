//! Registration store, health monitoring and the registry operations

pub mod health_monitor;
pub mod probe;
pub mod service;
pub mod store;

pub use health_monitor::{HealthMonitor, SweepReport};
pub use probe::{HealthProbe, HttpHealthProbe, ProbeOutcome};
pub use service::RegistryService;
pub use store::{ProbeTarget, ProbeTransition, ServiceStore};
