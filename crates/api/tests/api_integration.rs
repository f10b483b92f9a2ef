//! API integration tests.
//!
//! These tests drive the router end to end against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
    response::Response,
};
use opendraft_api::{AppState, auth_middleware, router as api_router};
use opendraft_db::entities::{post, user};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use serde_json::Value as Json;
use std::sync::Arc;
use tower::ServiceExt;

fn app(db: DatabaseConnection) -> Router {
    let state = AppState::new(Arc::new(db));
    api_router()
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

async fn body_json(response: Response) -> Json {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app(empty_db())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["message"], "OpenDraft API is running");
}

#[tokio::test]
async fn test_create_post_requires_authentication() {
    let response = app(empty_db())
        .oneshot(
            Request::builder()
                .uri("/posts")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"Hello","content":"World"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();

    let response = app(db)
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_page_is_rejected() {
    let response = app(empty_db())
        .oneshot(
            Request::builder()
                .uri("/posts?page=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_limit_above_maximum_is_rejected() {
    let response = app(empty_db())
        .oneshot(
            Request::builder()
                .uri("/posts?limit=51")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_beyond_maximum_is_rejected() {
    for uri in [
        "/posts?page=18446744073709551615",
        "/posts?page=100001",
        "/comments/post/p1?page=18446744073709551615",
    ] {
        let response = app(empty_db())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_list_posts_empty() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .append_query_results([[maplit::btreemap! {
            "num_items" => Value::BigInt(Some(0))
        }]])
        .into_connection();

    let response = app(db)
        .oneshot(Request::builder().uri("/posts").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["total"], 0);
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_reports_require_authentication() {
    let response = app(empty_db())
        .oneshot(Request::builder().uri("/reports").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let response = app(db)
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app(empty_db())
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
