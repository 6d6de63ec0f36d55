use std::net::SocketAddr;
use std::sync::Arc;

use citation_service::{
    build_router,
    config::CitationConfig,
    services::{
        metrics::init_metrics,
        store::{CredentialStore, PgStore, SummaryStore},
        HighlightService, IdentityResolver, JwtService, PolicyEngine, RemoteSummarizer,
        Summarizer, SummaryService, UserService,
    },
    utils::{Argon2Hasher, PasswordPolicy},
    AppState,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = CitationConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder not installed");
            None
        }
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = config.environment.as_str(),
        "Starting citation service"
    );

    let pg = PgStore::connect(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(e.into()))?;
    pg.run_migrations()
        .await
        .map_err(|e| AppError::DatabaseError(e.into()))?;
    let pg = Arc::new(pg);
    let store: Arc<dyn CredentialStore> = pg.clone();
    let summary_store: Arc<dyn SummaryStore> = pg;

    let jwt = JwtService::new(&config.jwt);
    let identity = IdentityResolver::new(jwt.clone(), Arc::clone(&store));
    let users = UserService::new(
        Arc::clone(&store),
        Arc::new(Argon2Hasher::new()),
        jwt,
        PasswordPolicy::with_min_length(config.password.min_length),
    );

    let granted = users.grant_admin(&config.security.admin_usernames).await?;
    if granted > 0 {
        tracing::info!(count = granted, "Bootstrap admins granted");
    }

    let summarizer = RemoteSummarizer::from_config(&config.summarizer)?
        .map(|remote| Arc::new(remote) as Arc<dyn Summarizer>);
    if summarizer.is_none() {
        tracing::warn!("SUMMARIZER_URL not set; summaries will stay empty");
    }

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let register_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.register_attempts,
        config.rate_limit.register_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login, Register and Global IP");

    let state = AppState {
        config: config.clone(),
        store: Arc::clone(&store),
        identity,
        policy: Arc::new(PolicyEngine::default()),
        users,
        highlights: HighlightService::new(Arc::clone(&store)),
        summaries: SummaryService::new(summary_store, summarizer),
        metrics,
        login_rate_limiter,
        register_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
