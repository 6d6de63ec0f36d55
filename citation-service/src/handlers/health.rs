use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    #[schema(example = "pong")]
    pub ping: String,
    #[schema(example = "dev")]
    pub environment: String,
    pub testing: bool,
}

/// Liveness plus a store round trip
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": state.config.service_name,
                "version": state.config.service_version,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unhealthy" })),
            )
        }
    }
}

#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, description = "Pong", body = PingResponse)),
    tag = "Health"
)]
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        ping: "pong".to_string(),
        environment: state.config.environment.as_str().to_string(),
        testing: state.config.testing,
    })
}
