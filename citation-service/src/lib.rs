pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::CitationConfig;
use crate::services::store::CredentialStore;
use crate::services::{HighlightService, IdentityResolver, PolicyEngine, SummaryService, UserService};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::ping,
        handlers::well_known::openapi,
        handlers::users::register,
        handlers::users::login,
        handlers::users::get_me,
        handlers::users::get_my_highlights,
        handlers::admin::get_user_by_username,
        handlers::admin::get_user_by_email,
        handlers::admin::get_user_by_id,
        handlers::admin::update_user_by_username,
        handlers::admin::update_user_by_email,
        handlers::admin::update_user_by_id,
        handlers::admin::delete_user_by_username,
        handlers::admin::delete_user_by_email,
        handlers::admin::delete_user_by_id,
        handlers::highlights::create_highlight,
        handlers::highlights::get_highlight,
        handlers::highlights::update_highlight,
        handlers::highlights::delete_highlight,
        handlers::highlights::list_public_highlights,
        handlers::highlights::get_public_highlight,
        handlers::summaries::create_summary,
        handlers::summaries::list_summaries,
        handlers::summaries::get_summary,
        handlers::summaries::update_summary,
        handlers::summaries::delete_summary,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::users::RegisterRequest,
            dtos::users::LoginForm,
            dtos::users::UpdateUserFlagsRequest,
            dtos::users::DeletedUserResponse,
            dtos::highlights::HighlightRequest,
            dtos::highlights::HighlightView,
            dtos::highlights::PublicHighlightView,
            dtos::highlights::HighlightRef,
            dtos::summaries::SummaryRequest,
            dtos::summaries::SummaryUpdateRequest,
            dtos::summaries::SummaryRef,
            handlers::health::PingResponse,
            services::TokenResponse,
            models::SanitizedUser,
            models::HighlightRegion,
            models::Summary,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Registration, login and the caller's own account"),
        (name = "Admin", description = "Account directory for administrators"),
        (name = "Highlights", description = "Document annotations keyed by DOI"),
        (name = "Summaries", description = "Page summaries produced in the background"),
        (name = "Health", description = "Service health"),
        (name = "Well-Known", description = "Public service metadata"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: CitationConfig,
    pub store: Arc<dyn CredentialStore>,
    pub identity: IdentityResolver,
    pub policy: Arc<PolicyEngine>,
    pub users: UserService,
    pub highlights: HighlightService,
    pub summaries: SummaryService,
    pub metrics: Option<PrometheusHandle>,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Bearer token, then policy. `route_layer` so the matched path is known
    // and unknown paths still 404 instead of 401.
    let protected_routes = Router::new()
        .route("/users/me/", get(handlers::users::get_me))
        .route(
            "/users/me/highlights/",
            get(handlers::users::get_my_highlights),
        )
        .route(
            "/users/admin/username/:username/",
            get(handlers::admin::get_user_by_username)
                .patch(handlers::admin::update_user_by_username)
                .delete(handlers::admin::delete_user_by_username),
        )
        .route(
            "/users/admin/email/:email/",
            get(handlers::admin::get_user_by_email)
                .patch(handlers::admin::update_user_by_email)
                .delete(handlers::admin::delete_user_by_email),
        )
        .route(
            "/users/admin/id/:id/",
            get(handlers::admin::get_user_by_id)
                .patch(handlers::admin::update_user_by_id)
                .delete(handlers::admin::delete_user_by_id),
        )
        .route(
            "/highlights/",
            post(handlers::highlights::create_highlight),
        )
        .route(
            "/highlights/:id/",
            get(handlers::highlights::get_highlight)
                .put(handlers::highlights::update_highlight)
                .delete(handlers::highlights::delete_highlight),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::authorize_middleware,
        ))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    let login_route = Router::new()
        .route("/users/token", post(handlers::users::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/users/", post(handlers::users::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ping", get(handlers::health::ping))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(handlers::well_known::openapi),
        )
        .route(
            "/highlights/public/",
            get(handlers::highlights::list_public_highlights),
        )
        .route(
            "/highlights/public/:id/",
            get(handlers::highlights::get_public_highlight),
        )
        .route(
            "/summaries/",
            post(handlers::summaries::create_summary).get(handlers::summaries::list_summaries),
        )
        .route(
            "/summaries/:id/",
            get(handlers::summaries::get_summary)
                .put(handlers::summaries::update_summary)
                .delete(handlers::summaries::delete_summary),
        );

    let cors = cors_layer(&state.config.security.allowed_origins);
    let ip_limiter = state.ip_rate_limiter.clone();

    Router::new()
        .merge(public_routes)
        .merge(login_route)
        .merge(register_route)
        .merge(protected_routes)
        .with_state(state)
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Rejected in prod by config validation.
    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}
