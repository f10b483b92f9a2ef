//! API endpoints.

#![allow(missing_docs)]

mod auth;
mod comments;
mod health;
mod notifications;
mod posts;
mod reports;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/users", users::router())
        .nest("/notifications", notifications::router())
        .nest("/reports", reports::router())
}
