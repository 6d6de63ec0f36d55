use axum::{extract::State, http::StatusCode, response::IntoResponse, Form, Json};
use service_core::error::AppError;

use crate::dtos::highlights::HighlightView;
use crate::dtos::users::{LoginForm, RegisterRequest};
use crate::middleware::AuthUser;
use crate::models::SanitizedUser;
use crate::services::{Registration, TokenResponse};
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

/// Register a new account
#[utoipa::path(
    post,
    path = "/users/",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SanitizedUser),
        (status = 409, description = "Username or email already registered", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Invalid input or weak password", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Too many registrations from this address")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .register(Registration {
            username: req.username,
            email: req.email.trim().to_lowercase(),
            full_name: req.full_name,
            password: Password::new(req.password),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SanitizedUser::from(user))))
}

/// Exchange username and password for an access token
#[utoipa::path(
    post,
    path = "/users/token",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Inactive user", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Incorrect username or password", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "Users"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let password = Password::new(form.password);
    let token = state.users.login(&form.username, &password).await?;
    Ok(Json(token))
}

/// The caller's own account
#[utoipa::path(
    get,
    path = "/users/me/",
    responses(
        (status = 200, description = "Current account", body = SanitizedUser),
        (status = 401, description = "Missing or invalid token", body = crate::dtos::ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_me(auth: AuthUser) -> Json<SanitizedUser> {
    Json(SanitizedUser::from(auth.user))
}

/// Every highlight the caller owns
#[utoipa::path(
    get,
    path = "/users/me/highlights/",
    responses(
        (status = 200, description = "Owned highlights", body = Vec<HighlightView>),
        (status = 401, description = "Missing or invalid token", body = crate::dtos::ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_my_highlights(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<HighlightView>>, AppError> {
    let highlights = state.highlights.list_for_user(&auth.user).await?;
    let views = highlights
        .into_iter()
        .map(|highlight| HighlightView::new(highlight, &auth.user.username))
        .collect();
    Ok(Json(views))
}
