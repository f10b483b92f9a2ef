//! Liveness probe.

use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde::Serialize;

use crate::middleware::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "OpenDraft API is running",
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
