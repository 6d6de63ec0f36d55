use axum::{extract::State, http::header, response::IntoResponse};

use crate::AppState;

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = match &state.metrics {
        Some(handle) => handle.render(),
        None => "# Metrics recorder not installed\n".to_string(),
    };

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
