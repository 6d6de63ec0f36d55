use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::highlights::{
    HighlightRef, HighlightRequest, HighlightView, PublicHighlightQuery, PublicHighlightView,
};
use crate::handlers::positive_id;
use crate::middleware::AuthUser;
use crate::models::{Doi, HighlightChanges};
use crate::services::ServiceError;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Annotate a document
#[utoipa::path(
    post,
    path = "/highlights/",
    request_body = HighlightRequest,
    responses(
        (status = 201, description = "Highlight created", body = HighlightRef),
        (status = 401, description = "Missing or invalid token", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Invalid DOI or highlight payload", body = crate::dtos::ErrorResponse)
    ),
    tag = "Highlights",
    security(("bearer_auth" = []))
)]
pub async fn create_highlight(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<HighlightRequest>,
) -> Result<impl IntoResponse, AppError> {
    let doi = Doi::parse(&req.doi).map_err(ServiceError::from)?;
    let created = state
        .highlights
        .create(&auth.user, doi, req.highlight, req.comment)
        .await?;

    Ok((StatusCode::CREATED, Json(HighlightRef::from(created))))
}

/// Read one of the caller's highlights
#[utoipa::path(
    get,
    path = "/highlights/{id}/",
    params(("id" = i64, Path, description = "Highlight id")),
    responses(
        (status = 200, description = "Highlight", body = HighlightView),
        (status = 403, description = "Not the owner", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such highlight", body = crate::dtos::ErrorResponse)
    ),
    tag = "Highlights",
    security(("bearer_auth" = []))
)]
pub async fn get_highlight(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<HighlightView>, AppError> {
    let highlight = state
        .highlights
        .get_owned(positive_id(id)?, &auth.user)
        .await?;
    Ok(Json(HighlightView::new(highlight, &auth.user.username)))
}

/// Replace the content and comment of a highlight. The DOI cannot change.
#[utoipa::path(
    put,
    path = "/highlights/{id}/",
    params(("id" = i64, Path, description = "Highlight id")),
    request_body = HighlightRequest,
    responses(
        (status = 200, description = "Highlight updated", body = HighlightView),
        (status = 403, description = "Not the owner", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such highlight", body = crate::dtos::ErrorResponse),
        (status = 422, description = "DOI differs from the stored one", body = crate::dtos::ErrorResponse)
    ),
    tag = "Highlights",
    security(("bearer_auth" = []))
)]
pub async fn update_highlight(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<HighlightRequest>,
) -> Result<Json<HighlightView>, AppError> {
    let id = positive_id(id)?;
    let doi = Doi::parse(&req.doi).map_err(ServiceError::from)?;
    let changes = HighlightChanges {
        doi,
        highlight: req.highlight,
        comment: req.comment,
    };

    let updated = state.highlights.update(id, &auth.user, changes).await?;
    Ok(Json(HighlightView::new(updated, &auth.user.username)))
}

#[utoipa::path(
    delete,
    path = "/highlights/{id}/",
    params(("id" = i64, Path, description = "Highlight id")),
    responses(
        (status = 200, description = "Highlight deleted", body = HighlightRef),
        (status = 403, description = "Not the owner", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such highlight", body = crate::dtos::ErrorResponse)
    ),
    tag = "Highlights",
    security(("bearer_auth" = []))
)]
pub async fn delete_highlight(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<HighlightRef>, AppError> {
    let deleted = state.highlights.delete(positive_id(id)?, &auth.user).await?;
    Ok(Json(HighlightRef::from(deleted)))
}

/// Anonymous listing, optionally narrowed to one DOI
#[utoipa::path(
    get,
    path = "/highlights/public/",
    params(PublicHighlightQuery),
    responses(
        (status = 200, description = "Highlights", body = Vec<PublicHighlightView>),
        (status = 422, description = "Invalid DOI filter", body = crate::dtos::ErrorResponse)
    ),
    tag = "Highlights"
)]
pub async fn list_public_highlights(
    State(state): State<AppState>,
    Query(query): Query<PublicHighlightQuery>,
) -> Result<Json<Vec<PublicHighlightView>>, AppError> {
    let doi = query
        .doi
        .as_deref()
        .map(Doi::parse)
        .transpose()
        .map_err(ServiceError::from)?;

    let highlights = state.highlights.list_public(doi.as_ref()).await?;
    Ok(Json(highlights.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/highlights/public/{id}/",
    params(("id" = i64, Path, description = "Highlight id")),
    responses(
        (status = 200, description = "Highlight", body = PublicHighlightView),
        (status = 404, description = "No such highlight", body = crate::dtos::ErrorResponse)
    ),
    tag = "Highlights"
)]
pub async fn get_public_highlight(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicHighlightView>, AppError> {
    let highlight = state.highlights.get_public(positive_id(id)?).await?;
    Ok(Json(highlight.into()))
}
