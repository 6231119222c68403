// Module: http
// HTTP/JSON surface of the service registry

pub mod error;
pub mod health;
pub mod services;

use axum::Router;
use tower_http::trace::TraceLayer;

use registrar_registry::RegistryService;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryService,
}

/// Create the HTTP router with all routes
pub fn create_router(registry: RegistryService) -> Router {
    let state = AppState { registry };

    Router::new()
        .merge(health::create_health_router())
        .merge(services::create_services_router())
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route not found")
}
