use axum::Json;
use utoipa::OpenApi;

use crate::ApiDoc;

/// OpenAPI document for the whole service
#[utoipa::path(
    get,
    path = "/.well-known/openapi.json",
    responses((status = 200, description = "OpenAPI document")),
    tag = "Well-Known"
)]
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
