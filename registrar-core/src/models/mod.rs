pub mod service;

pub use service::{
    base_url, DiscoverResponse, HealthReport, MessageResponse, ProbeDetails, RegisterRequest,
    RegisterResponse, RegistryStatus, ServiceDescriptor, ServiceList, ServiceRegistration,
    ServiceStatus, DEFAULT_HEALTH_PATH,
};
