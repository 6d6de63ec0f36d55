use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::User;
use crate::services::{ServiceError, Subject};
use crate::AppState;

/// Account resolved from the bearer token, set by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Account plus the subject the policy engine authorized, set by
/// `authorize_middleware`. Handlers behind the policy take this.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub subject: Subject,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

/// Middleware to require authentication
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(ServiceError::Unauthenticated)?;

    let user = state.identity.resolve(token).await.map_err(|e| {
        tracing::info!(error = %e, path = %req.uri().path(), "Authentication failed");
        e
    })?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .filter(|auth| auth.subject.is_authorized())
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Authorization context missing from request extensions"
                ))
            })
    }
}
