//! Health check endpoints
//!
//! `/health` reports the registry's own liveness; `/health/{name}` polls a
//! registered service on demand.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use registrar_core::models::{HealthReport, RegistryStatus};

use crate::http::{AppResult, AppState};

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/{name}", get(service_health))
}

/// Registry liveness (always OK while the process is serving)
pub async fn health_check(State(state): State<AppState>) -> Json<RegistryStatus> {
    Json(state.registry.self_status())
}

/// On-demand poll of one registered service; does not change its stored status
pub async fn service_health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<HealthReport>> {
    Ok(Json(state.registry.check_health(&name).await?))
}
