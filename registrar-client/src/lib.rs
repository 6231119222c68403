//! Caller-side pieces of the registry: discovery with caching and fallback,
//! and startup self-registration with retry.

pub mod discovery;
pub mod registration;
pub mod registry_client;
pub mod resolver;

pub use discovery::{CachedResolution, DiscoveryClient};
pub use registration::{register_with_retry, spawn_self_registration, RetryPolicy};
pub use registry_client::RegistryClient;
pub use resolver::{Resolution, ResolutionSource, Resolver, StaticResolver};
