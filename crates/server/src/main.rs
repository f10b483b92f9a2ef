//! OpenDraft server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::HeaderValue, middleware};
use opendraft_api::{
    AppState, RateLimiterState, auth_middleware, rate_limit_middleware, router as api_router,
    spawn_cleanup,
};
use opendraft_common::{Config, config::LogFormat};
use opendraft_core::{SchedulerConfig, run_scheduler};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.logging.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config);

    info!("Starting OpenDraft server...");

    let db = opendraft_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    opendraft_db::migrate(&db).await?;

    let state = AppState::new(Arc::new(db));

    let rate_limiter = RateLimiterState::from_settings(&config.rate_limit);
    let cleanup = rate_limiter.enabled.then(|| spawn_cleanup(rate_limiter.clone()));

    let scheduler = if config.scheduler.enabled {
        Some(run_scheduler(
            SchedulerConfig::from(&config.scheduler),
            Arc::new(state.post_service.clone()),
        ))
    } else {
        info!("Scheduled publishing is disabled");
        None
    };

    // Layers run bottom-up: the auth layer resolves the user before the
    // rate limiter keys on it.
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .map_response(|res: axum::response::Response<_>| res.map(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config.cors.allowed_origins)),
        )
        .with_state(state);

    let ip = config
        .server
        .host
        .parse()
        .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0]));
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    if let Some(handle) = cleanup {
        handle.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}
