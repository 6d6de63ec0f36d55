//! Shared harness for citation-service integration tests.
//!
//! Builds the real router over an in-memory store and a scripted
//! summarizer, and drives it with `oneshot` requests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use citation_service::{
    build_router,
    config::{
        CitationConfig, DatabaseConfig, Environment, JwtConfig, PasswordConfig, RateLimitConfig,
        SecurityConfig, SummarizerConfig,
    },
    models::{UserFlags, UserLookup},
    services::{
        store::{CredentialStore, MemoryStore},
        HighlightService, IdentityResolver, JwtService, MockSummarizer, PolicyEngine, Summarizer,
        SummaryService, UserService,
    },
    utils::{Argon2Hasher, PasswordPolicy},
    AppState,
};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "Str0ng!Pass";
pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_config() -> CitationConfig {
    CitationConfig {
        common: CoreConfig { port: 0 },
        environment: Environment::Dev,
        testing: true,
        service_name: "citation-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: SecretString::new(TEST_SECRET.to_string()),
            algorithm: Algorithm::HS256,
            access_token_expiry_minutes: 15,
        },
        password: PasswordConfig { min_length: 8 },
        summarizer: SummarizerConfig {
            url: None,
            timeout_seconds: 5,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_usernames: Vec::new(),
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            register_attempts: 100,
            register_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub summarizer: Arc<MockSummarizer>,
    pub config: CitationConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(test_config(), MockSummarizer::replying("A concise summary."))
    }

    pub fn with_config(config: CitationConfig) -> Self {
        Self::build(config, MockSummarizer::replying("A concise summary."))
    }

    pub fn with_summarizer(summarizer: MockSummarizer) -> Self {
        Self::build(test_config(), summarizer)
    }

    fn build(config: CitationConfig, summarizer: MockSummarizer) -> Self {
        let store = MemoryStore::new();
        let credentials: Arc<dyn CredentialStore> = Arc::new(store.clone());
        let summarizer = Arc::new(summarizer);

        let jwt = JwtService::new(&config.jwt);
        let users = UserService::new(
            Arc::clone(&credentials),
            Arc::new(Argon2Hasher::new()),
            jwt.clone(),
            PasswordPolicy::with_min_length(config.password.min_length),
        );

        let state = AppState {
            config: config.clone(),
            store: Arc::clone(&credentials),
            identity: IdentityResolver::new(jwt, Arc::clone(&credentials)),
            policy: Arc::new(PolicyEngine::default()),
            users,
            highlights: HighlightService::new(Arc::clone(&credentials)),
            summaries: SummaryService::new(
                Arc::new(store.clone()),
                Some(summarizer.clone() as Arc<dyn Summarizer>),
            ),
            metrics: None,
            login_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.login_attempts,
                config.rate_limit.login_window_seconds,
            ),
            register_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.register_attempts,
                config.rate_limit.register_window_seconds,
            ),
            ip_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.global_ip_limit,
                config.rate_limit.global_ip_window_seconds,
            ),
        };

        Self {
            router: build_router(state),
            store,
            summarizer,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/users/",
            None,
            Some(json!({
                "username": username,
                "email": email,
                "password": password,
            })),
        )
        .await
    }

    pub async fn login_response(&self, username: &str, password: &str) -> TestResponse {
        let form = format!("username={}&password={}&grant_type=password", username, password);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        self.send(request).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self.login_response(username, password).await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        res.body["access_token"].as_str().unwrap().to_string()
    }

    /// Register `username` with the shared strong password and log in.
    pub async fn signup(&self, username: &str) -> String {
        let res = self
            .register(username, &format!("{}@example.com", username), PASSWORD)
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);
        self.login(username, PASSWORD).await
    }

    pub async fn set_flags(&self, username: &str, flags: UserFlags) {
        self.store
            .update_user_flags(&UserLookup::Username(username.to_string()), flags)
            .await
            .unwrap()
            .unwrap();
    }

    pub async fn make_admin(&self, username: &str) {
        self.set_flags(
            username,
            UserFlags {
                disabled: None,
                is_admin: Some(true),
            },
        )
        .await;
    }

    pub async fn disable(&self, username: &str) {
        self.set_flags(
            username,
            UserFlags {
                disabled: Some(true),
                is_admin: None,
            },
        )
        .await;
    }
}

pub fn highlight_body(doi: &str, text: &str, comment: Option<&str>) -> Value {
    json!({
        "doi": doi,
        "highlight": {
            "1": { "rect": [10.0, 20.0, 110.0, 40.0], "text": text }
        },
        "comment": comment,
    })
}
