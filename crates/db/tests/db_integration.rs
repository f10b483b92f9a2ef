//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `opendraft_test`)
//!   `TEST_DB_PASSWORD` (default: `opendraft_test`)
//!   `TEST_DB_NAME` (default: `opendraft_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use opendraft_db::entities::{
    comment, following, notification, notification::NotificationType, post, post::PostStatus,
    post_like, user, user::UserRole,
};
use opendraft_db::repositories::{
    CommentRepository, FollowingRepository, PostRepository, UserRepository,
};
use opendraft_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{DatabaseConnection, Set};

async fn seed_user(db: &Arc<DatabaseConnection>, id: &str) -> user::Model {
    UserRepository::new(Arc::clone(db))
        .create(user::ActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("User {id}")),
            email: Set(format!("{id}@example.com")),
            password_hash: Set("hash".to_string()),
            role: Set(UserRole::Author),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .await
        .expect("seed user")
}

async fn seed_post(
    db: &Arc<DatabaseConnection>,
    id: &str,
    author_id: &str,
    status: PostStatus,
) -> post::Model {
    PostRepository::new(Arc::clone(db))
        .create(post::ActiveModel {
            id: Set(id.to_string()),
            author_id: Set(author_id.to_string()),
            title: Set("Integration".to_string()),
            slug: Set(format!("integration-{id}")),
            content: Set("Integration test content".to_string()),
            tags: Set(serde_json::json!(["rust", "db"])),
            category: Set("General".to_string()),
            status: Set(status),
            views: Set(0),
            read_time: Set(1),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .await
        .expect("seed post")
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_like_is_conflict() {
    let test_db = TestDatabase::create_unique().await.expect("create db");
    let db = Arc::new(test_db.conn.clone());

    seed_user(&db, "alice").await;
    seed_post(&db, "p1", "alice", PostStatus::Published).await;

    let posts = PostRepository::new(Arc::clone(&db));
    let like = |id: &str| post_like::ActiveModel {
        id: Set(id.to_string()),
        post_id: Set("p1".to_string()),
        user_id: Set("alice".to_string()),
        created_at: Set(Utc::now().into()),
    };

    posts.add_like(like("l1")).await.unwrap();
    let second = posts.add_like(like("l2")).await;
    assert!(matches!(second, Err(opendraft_common::AppError::Conflict(_))));
    assert_eq!(posts.count_likes("p1").await.unwrap(), 1);

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_follow_twice_creates_one_edge_and_one_notification() {
    let test_db = TestDatabase::create_unique().await.expect("create db");
    let db = Arc::new(test_db.conn.clone());

    seed_user(&db, "alice").await;
    seed_user(&db, "bob").await;

    let repo = FollowingRepository::new(Arc::clone(&db));
    let attempt = |n: &str| {
        let edge = following::ActiveModel {
            id: Set(format!("f{n}")),
            follower_id: Set("alice".to_string()),
            followee_id: Set("bob".to_string()),
            created_at: Set(Utc::now().into()),
        };
        let note = notification::ActiveModel {
            id: Set(format!("n{n}")),
            user_id: Set("bob".to_string()),
            actor_id: Set(Some("alice".to_string())),
            notification_type: Set(NotificationType::Follow),
            data: Set(serde_json::json!({ "followerId": "alice" })),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };
        (edge, note)
    };

    let (edge, note) = attempt("1");
    assert!(repo.create_with_notification(edge, note).await.unwrap());
    let (edge, note) = attempt("2");
    assert!(!repo.create_with_notification(edge, note).await.unwrap());

    assert_eq!(repo.count_followers("bob").await.unwrap(), 1);
    assert_eq!(repo.count_following("alice").await.unwrap(), 1);

    let notifications = opendraft_db::repositories::NotificationRepository::new(Arc::clone(&db));
    assert_eq!(notifications.count_by_user("bob", false).await.unwrap(), 1);

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_scheduled_draft_is_published_once() {
    let test_db = TestDatabase::create_unique().await.expect("create db");
    let db = Arc::new(test_db.conn.clone());

    seed_user(&db, "alice").await;
    let draft = seed_post(&db, "p1", "alice", PostStatus::Draft).await;

    let posts = PostRepository::new(Arc::clone(&db));
    let mut active: post::ActiveModel = draft.into();
    active.scheduled_date = Set(Some((Utc::now() - Duration::minutes(1)).into()));
    posts.update(active).await.unwrap();

    let now = Utc::now();
    let due = posts.find_due_scheduled(now).await.unwrap();
    assert_eq!(due.len(), 1);

    assert_eq!(posts.publish_if_draft("p1", now).await.unwrap(), 1);
    assert_eq!(posts.publish_if_draft("p1", now).await.unwrap(), 0);
    assert!(posts.find_due_scheduled(now).await.unwrap().is_empty());

    let published = posts.get_by_id("p1").await.unwrap();
    assert_eq!(published.status, PostStatus::Published);
    assert!(published.published_at.is_some());

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_post_cascades_to_comments() {
    let test_db = TestDatabase::create_unique().await.expect("create db");
    let db = Arc::new(test_db.conn.clone());

    seed_user(&db, "alice").await;
    seed_post(&db, "p1", "alice", PostStatus::Published).await;

    let comments = CommentRepository::new(Arc::clone(&db));
    let make = |id: &str, parent: Option<&str>| comment::ActiveModel {
        id: Set(id.to_string()),
        post_id: Set("p1".to_string()),
        author_id: Set("alice".to_string()),
        parent_id: Set(parent.map(ToString::to_string)),
        content: Set("Hello".to_string()),
        status: Set(comment::CommentStatus::Approved),
        is_edited: Set(false),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    comments.create(make("c1", None)).await.unwrap();
    comments.create(make("c2", Some("c1"))).await.unwrap();

    assert_eq!(comments.find_replies("c1", None).await.unwrap().len(), 1);

    PostRepository::new(Arc::clone(&db)).delete("p1").await.unwrap();
    assert!(comments.find_by_id("c1").await.unwrap().is_none());
    assert!(comments.find_by_id("c2").await.unwrap().is_none());

    test_db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
