//! Registration and discovery endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};

use registrar_core::models::{
    DiscoverResponse, MessageResponse, RegisterRequest, RegisterResponse, ServiceDescriptor,
    ServiceList,
};

use crate::http::{AppResult, AppState};

/// Create registration/discovery routes
pub fn create_services_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/deregister/{name}", delete(deregister))
        .route("/services", get(list_services))
        .route("/services/{name}", get(get_service))
        .route("/discover/{name}", get(discover))
}

/// POST /register
///
/// Body: `{name, host, port, healthEndpoint?}`. Replaces any existing
/// registration under the same name.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = payload?;
    let service = state.registry.register(&request)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: format!("Service '{}' registered successfully", service.name),
            service,
        }),
    ))
}

/// DELETE /deregister/{name}
pub async fn deregister(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.registry.deregister(&name)?;

    Ok(Json(MessageResponse {
        message: format!("Service '{name}' deregistered successfully"),
    }))
}

/// GET /services
pub async fn list_services(State(state): State<AppState>) -> Json<ServiceList> {
    Json(ServiceList::from(state.registry.list()))
}

/// GET /services/{name}
pub async fn get_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ServiceDescriptor>> {
    Ok(Json(state.registry.get(&name)?))
}

/// GET /discover/{name}
///
/// 404 when the name was never registered (or has been evicted),
/// 503 while it is registered but failing health checks.
pub async fn discover(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<DiscoverResponse>> {
    let resolved = state.registry.discover(&name).inspect_err(|e| {
        tracing::debug!(service = %name, error = %e, "Discovery failed");
    })?;

    Ok(Json(resolved))
}
