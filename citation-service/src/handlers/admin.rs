//! Admin directory: lookup, flag update and deletion of any account by
//! username, email or id. The policy layer has already checked the admin
//! flag by the time these run.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::users::{DeletedUserResponse, UpdateUserFlagsRequest};
use crate::handlers::positive_id;
use crate::middleware::AuthUser;
use crate::models::{SanitizedUser, UserLookup};
use crate::utils::ValidatedJson;
use crate::AppState;

async fn find(state: &AppState, lookup: UserLookup) -> Result<Json<SanitizedUser>, AppError> {
    let user = state.users.find(&lookup).await?;
    Ok(Json(SanitizedUser::from(user)))
}

async fn update(
    state: &AppState,
    admin: &AuthUser,
    lookup: UserLookup,
    req: UpdateUserFlagsRequest,
) -> Result<Json<SanitizedUser>, AppError> {
    tracing::info!(admin_id = admin.user.id, target = %lookup, "Admin updating user flags");
    let user = state.users.update_flags(&lookup, req.into()).await?;
    Ok(Json(SanitizedUser::from(user)))
}

async fn delete(
    state: &AppState,
    admin: &AuthUser,
    lookup: UserLookup,
) -> Result<Json<DeletedUserResponse>, AppError> {
    tracing::info!(admin_id = admin.user.id, target = %lookup, "Admin deleting user");
    let user = state.users.delete(&lookup).await?;
    Ok(Json(DeletedUserResponse {
        id: user.id,
        username: user.username,
    }))
}

fn email_lookup(email: String) -> UserLookup {
    UserLookup::Email(email.trim().to_lowercase())
}

#[utoipa::path(
    get,
    path = "/users/admin/username/{username}/",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 200, description = "Account found", body = SanitizedUser),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    _admin: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<SanitizedUser>, AppError> {
    find(&state, UserLookup::Username(username)).await
}

#[utoipa::path(
    get,
    path = "/users/admin/email/{email}/",
    params(("email" = String, Path, description = "Account email")),
    responses(
        (status = 200, description = "Account found", body = SanitizedUser),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    _admin: AuthUser,
    Path(email): Path<String>,
) -> Result<Json<SanitizedUser>, AppError> {
    find(&state, email_lookup(email)).await
}

#[utoipa::path(
    get,
    path = "/users/admin/id/{id}/",
    params(("id" = i64, Path, description = "Account id, greater than zero")),
    responses(
        (status = 200, description = "Account found", body = SanitizedUser),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Id is not positive", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    _admin: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<SanitizedUser>, AppError> {
    find(&state, UserLookup::Id(positive_id(id)?)).await
}

#[utoipa::path(
    patch,
    path = "/users/admin/username/{username}/",
    params(("username" = String, Path, description = "Account username")),
    request_body = UpdateUserFlagsRequest,
    responses(
        (status = 200, description = "Flags updated", body = SanitizedUser),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn update_user_by_username(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateUserFlagsRequest>,
) -> Result<Json<SanitizedUser>, AppError> {
    update(&state, &admin, UserLookup::Username(username), req).await
}

#[utoipa::path(
    patch,
    path = "/users/admin/email/{email}/",
    params(("email" = String, Path, description = "Account email")),
    request_body = UpdateUserFlagsRequest,
    responses(
        (status = 200, description = "Flags updated", body = SanitizedUser),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn update_user_by_email(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(email): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateUserFlagsRequest>,
) -> Result<Json<SanitizedUser>, AppError> {
    update(&state, &admin, email_lookup(email), req).await
}

#[utoipa::path(
    patch,
    path = "/users/admin/id/{id}/",
    params(("id" = i64, Path, description = "Account id, greater than zero")),
    request_body = UpdateUserFlagsRequest,
    responses(
        (status = 200, description = "Flags updated", body = SanitizedUser),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Id is not positive", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn update_user_by_id(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateUserFlagsRequest>,
) -> Result<Json<SanitizedUser>, AppError> {
    update(&state, &admin, UserLookup::Id(positive_id(id)?), req).await
}

#[utoipa::path(
    delete,
    path = "/users/admin/username/{username}/",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 200, description = "Account deleted", body = DeletedUserResponse),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn delete_user_by_username(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<DeletedUserResponse>, AppError> {
    delete(&state, &admin, UserLookup::Username(username)).await
}

#[utoipa::path(
    delete,
    path = "/users/admin/email/{email}/",
    params(("email" = String, Path, description = "Account email")),
    responses(
        (status = 200, description = "Account deleted", body = DeletedUserResponse),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn delete_user_by_email(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(email): Path<String>,
) -> Result<Json<DeletedUserResponse>, AppError> {
    delete(&state, &admin, email_lookup(email)).await
}

#[utoipa::path(
    delete,
    path = "/users/admin/id/{id}/",
    params(("id" = i64, Path, description = "Account id, greater than zero")),
    responses(
        (status = 200, description = "Account deleted", body = DeletedUserResponse),
        (status = 403, description = "Caller is not an admin", body = crate::dtos::ErrorResponse),
        (status = 404, description = "No such account", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Id is not positive", body = crate::dtos::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn delete_user_by_id(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedUserResponse>, AppError> {
    delete(&state, &admin, UserLookup::Id(positive_id(id)?)).await
}
