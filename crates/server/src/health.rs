use std::sync::Arc;

use axum::{Json, extract::State};
use http::StatusCode;
use messaging::MessagingService;

#[derive(Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub(crate) enum HealthState {
    /// Indicates that the server is healthy and operational.
    Healthy,

    /// The database stopped accepting connections.
    Unhealthy,
}

/// Handles health check requests and returns the current health status of the server.
pub(crate) async fn health(State(service): State<Arc<MessagingService>>) -> (StatusCode, Json<HealthState>) {
    if service.database().is_closed() {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(HealthState::Unhealthy));
    }

    (StatusCode::OK, Json(HealthState::Healthy))
}
