use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::middleware::auth::{AuthUser, CurrentUser};
use crate::services::metrics::record_policy_decision;
use crate::services::policy::normalize_resource;
use crate::services::{Action, ServiceError, Subject};
use crate::AppState;

/// Ask the policy engine about the matched route and HTTP method.
///
/// Must run inside [`auth_middleware`](super::auth_middleware) and be
/// attached with `route_layer` so the matched path is known.
pub async fn authorize_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let CurrentUser(user) = req
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or(ServiceError::Unauthenticated)?;

    let resource = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| normalize_resource(path.as_str()))
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Policy check outside a matched route"))
        })?;

    let Some(action) = Action::from_method(req.method()) else {
        tracing::warn!(method = %req.method(), resource = %resource, "No policy action for method");
        return Err(ServiceError::PolicyForbidden.into());
    };

    match state.policy.enforce(Subject::from(&user), &resource, action) {
        Ok((subject, decision)) => {
            record_policy_decision(decision.rule_name(), true);
            tracing::debug!(
                user_id = user.id,
                resource = %resource,
                action = %action,
                rule = decision.rule_name(),
                "Policy allowed"
            );
            req.extensions_mut().insert(AuthUser { user, subject });
            Ok(next.run(req).await)
        }
        Err((err, decision)) => {
            record_policy_decision(decision.rule_name(), false);
            tracing::warn!(
                user_id = user.id,
                resource = %resource,
                action = %action,
                rule = decision.rule_name(),
                "Policy denied"
            );
            Err(err.into())
        }
    }
}
