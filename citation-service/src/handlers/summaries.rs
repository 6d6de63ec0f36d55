use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::summaries::{SummaryRef, SummaryRequest, SummaryUpdateRequest};
use crate::handlers::positive_id;
use crate::models::Summary;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Store a URL and summarise it in the background
#[utoipa::path(
    post,
    path = "/summaries/",
    request_body = SummaryRequest,
    responses(
        (status = 201, description = "Summary record created", body = SummaryRef),
        (status = 422, description = "Invalid URL", body = crate::dtos::ErrorResponse)
    ),
    tag = "Summaries"
)]
pub async fn create_summary(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SummaryRequest>,
) -> Result<impl IntoResponse, AppError> {
    // The background task outlives the request; its handle is not needed here.
    let (summary, _task) = state.summaries.create(&req.url).await?;
    Ok((StatusCode::CREATED, Json(SummaryRef::from(summary))))
}

#[utoipa::path(
    get,
    path = "/summaries/",
    responses((status = 200, description = "All summaries", body = Vec<Summary>)),
    tag = "Summaries"
)]
pub async fn list_summaries(
    State(state): State<AppState>,
) -> Result<Json<Vec<Summary>>, AppError> {
    Ok(Json(state.summaries.list().await?))
}

#[utoipa::path(
    get,
    path = "/summaries/{id}/",
    params(("id" = i64, Path, description = "Summary id")),
    responses(
        (status = 200, description = "Summary", body = Summary),
        (status = 404, description = "No such summary", body = crate::dtos::ErrorResponse)
    ),
    tag = "Summaries"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Summary>, AppError> {
    Ok(Json(state.summaries.get(positive_id(id)?).await?))
}

#[utoipa::path(
    put,
    path = "/summaries/{id}/",
    params(("id" = i64, Path, description = "Summary id")),
    request_body = SummaryUpdateRequest,
    responses(
        (status = 200, description = "Summary updated", body = Summary),
        (status = 404, description = "No such summary", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Invalid URL", body = crate::dtos::ErrorResponse)
    ),
    tag = "Summaries"
)]
pub async fn update_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<SummaryUpdateRequest>,
) -> Result<Json<Summary>, AppError> {
    let updated = state
        .summaries
        .update(positive_id(id)?, &req.url, &req.summary)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/summaries/{id}/",
    params(("id" = i64, Path, description = "Summary id")),
    responses(
        (status = 200, description = "Summary deleted", body = SummaryRef),
        (status = 404, description = "No such summary", body = crate::dtos::ErrorResponse)
    ),
    tag = "Summaries"
)]
pub async fn delete_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SummaryRef>, AppError> {
    let deleted = state.summaries.delete(positive_id(id)?).await?;
    Ok(Json(SummaryRef::from(deleted)))
}
