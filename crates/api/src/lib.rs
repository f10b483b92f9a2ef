//! HTTP API layer for OpenDraft.
//!
//! - **Endpoints**: auth, posts, comments, users, notifications, reports
//! - **Extractors**: bearer authentication, validated JSON and query strings
//! - **Middleware**: token resolution and per-client rate limiting
//! - **Response**: the `{ success, data, message, ... }` envelope
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use rate_limit::{
    ApiRateLimiter, RateLimitConfig, RateLimiterState, rate_limit_middleware, spawn_cleanup,
};
pub use response::ApiResponse;
