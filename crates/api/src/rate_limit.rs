//! API rate limiting middleware.
//!
//! Fixed-window counters per user (when authenticated) or per client IP.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use opendraft_common::{AppError, config::RateLimitSettings};
use opendraft_db::entities::user;
use tokio::sync::RwLock;

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Time window duration in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

impl Default for RateLimitConfig {
    /// 100 requests per 15 minutes.
    fn default() -> Self {
        Self::new(100, 900)
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, settings.window_secs)
    }
}

/// Rate limit state for a single key.
#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }
}

/// API rate limiter.
#[derive(Clone)]
pub struct ApiRateLimiter {
    /// State per key (user ID or IP address).
    states: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if a request is allowed and record it.
    pub async fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let window = Duration::from_secs(config.window_secs);

        let state = states
            .entry(key.to_string())
            .or_insert_with(RateLimitState::new);

        if now.duration_since(state.window_start) >= window {
            state.count = 0;
            state.window_start = now;
        }

        let reset = window
            .saturating_sub(now.duration_since(state.window_start))
            .as_secs();

        if state.count >= config.max_requests {
            return RateLimitResult::Limited {
                retry_after: reset.max(1),
                limit: config.max_requests,
            };
        }

        state.count += 1;

        RateLimitResult::Allowed {
            remaining: config.max_requests.saturating_sub(state.count),
            limit: config.max_requests,
            reset,
        }
    }

    /// Drop keys whose window ended long ago.
    pub async fn cleanup(&self, window_secs: u64) {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let max_age = Duration::from_secs(window_secs * 2);

        states.retain(|_, state| now.duration_since(state.window_start) < max_age);
    }

    pub async fn key_count(&self) -> usize {
        self.states.read().await.len()
    }
}

/// Rate limit check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed {
        remaining: u32,
        limit: u32,
        /// Seconds until window reset.
        reset: u64,
    },
    Limited {
        retry_after: u64,
        limit: u32,
    },
}

/// Rate limiter state for middleware.
#[derive(Clone)]
pub struct RateLimiterState {
    pub limiter: ApiRateLimiter,
    pub config: RateLimitConfig,
    pub enabled: bool,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiterState {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: ApiRateLimiter::new(),
            config,
            enabled: true,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ..Self::new(RateLimitConfig::from(settings))
        }
    }
}

/// Rate limit error response: the usual error envelope plus `Retry-After`.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        (
            [("Retry-After", self.retry_after.to_string())],
            AppError::RateLimited,
        )
            .into_response()
    }
}

/// Extract client IP from proxy headers.
fn extract_client_ip(req: &Request<Body>) -> Option<IpAddr> {
    if let Some(xff) = req.headers().get("x-forwarded-for")
        && let Ok(xff_str) = xff.to_str()
        && let Some(first_ip) = xff_str.split(',').next()
        && let Ok(ip) = first_ip.trim().parse::<IpAddr>()
    {
        return Some(ip);
    }

    req.headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn rate_limit_key(req: &Request<Body>) -> String {
    // The user is set by the auth middleware, which runs first.
    if let Some(user) = req.extensions().get::<user::Model>() {
        format!("user:{}", user.id)
    } else if let Some(ip) = extract_client_ip(req) {
        format!("ip:{ip}")
    } else {
        "unknown".to_string()
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(state): State<RateLimiterState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.enabled {
        return Ok(next.run(req).await);
    }

    let key = rate_limit_key(&req);

    match state.limiter.check(&key, &state.config).await {
        RateLimitResult::Allowed {
            remaining,
            limit,
            reset,
        } => {
            let mut response = next.run(req).await;

            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", limit.into());
            headers.insert("X-RateLimit-Remaining", remaining.into());
            headers.insert("X-RateLimit-Reset", reset.into());

            Ok(response)
        }
        RateLimitResult::Limited { retry_after, limit } => {
            tracing::warn!(key = %key, limit, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after })
        }
    }
}

/// Periodically evict stale keys.
pub fn spawn_cleanup(state: RateLimiterState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let window = state.config.window_secs.max(1);
        let mut interval = tokio::time::interval(Duration::from_secs(window));
        loop {
            interval.tick().await;
            state.limiter.cleanup(window).await;
        }
    })
}
