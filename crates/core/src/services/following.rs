//! Following service.

use chrono::Utc;
use opendraft_common::{AppError, AppResult, IdGenerator};
use opendraft_db::{
    entities::{following, notification::NotificationType, user},
    repositories::{FollowingRepository, UserRepository},
};
use sea_orm::Set;
use serde_json::json;

use crate::pagination::{Page, PageRequest};
use crate::services::notification::NotificationService;

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

/// Result of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOutcome {
    /// The edge existed before this call; nothing was written.
    pub already_following: bool,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        following_repo: FollowingRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            following_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user.
    ///
    /// Re-following is a no-op. The edge and its `follow` notification are
    /// written in one transaction, and the notification only when the edge
    /// is new, so concurrent duplicates notify at most once.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowOutcome> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }

        let followee = self.user_repo.get_by_id(followee_id).await?;

        let edge = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee.id.clone()),
            created_at: Set(Utc::now().into()),
        };
        let notification = self.notification_service.build(
            &followee.id,
            follower_id,
            NotificationType::Follow,
            json!({ "followerId": follower_id }),
        );

        let created = self
            .following_repo
            .create_with_notification(edge, notification)
            .await?;

        if created {
            tracing::info!(follower_id, followee_id, "User followed");
        }

        Ok(FollowOutcome {
            already_following: !created,
        })
    }

    /// Unfollow a user. Not following is not an error.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        let followee = self.user_repo.get_by_id(followee_id).await?;
        let removed = self
            .following_repo
            .delete_by_pair(follower_id, &followee.id)
            .await?;

        if removed > 0 {
            tracing::info!(follower_id, followee_id, "User unfollowed");
        }
        Ok(())
    }

    /// Users following `user_id`.
    pub async fn followers(&self, user_id: &str, page: PageRequest) -> AppResult<Page<user::Model>> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let users = self
            .following_repo
            .find_followers(&user.id, page.offset(), page.limit)
            .await?;
        let total = self.following_repo.count_followers(&user.id).await?;
        Ok(Page::new(users, total, page))
    }

    /// Users that `user_id` follows.
    pub async fn following(&self, user_id: &str, page: PageRequest) -> AppResult<Page<user::Model>> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let users = self
            .following_repo
            .find_following(&user.id, page.offset(), page.limit)
            .await?;
        let total = self.following_repo.count_following(&user.id).await?;
        Ok(Page::new(users, total, page))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opendraft_db::entities::{notification, user::UserRole};
    use opendraft_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            token: None,
            bio: None,
            avatar: None,
            role: UserRole::Reader,
            is_verified: false,
            last_login: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection) -> FollowingService {
        let db = Arc::new(db);
        FollowingService::new(
            FollowingRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
            NotificationService::new(NotificationRepository::new(db)),
        )
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_cannot_follow_self() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db).follow("alice", "alice").await;

        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "You cannot follow yourself"),
            _ => panic!("Expected BadRequest"),
        }
    }

    #[tokio::test]
    async fn test_follow_missing_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).follow("alice", "ghost").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_creates_edge() {
        let notification = notification::Model {
            id: "n1".to_string(),
            user_id: "bob".to_string(),
            actor_id: Some("alice".to_string()),
            notification_type: NotificationType::Follow,
            data: json!({ "followerId": "alice" }),
            is_read: false,
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("bob")]])
            .append_exec_results([exec(1)])
            .append_query_results([[notification]])
            .into_connection();

        let outcome = service(db).follow("alice", "bob").await.unwrap();
        assert!(!outcome.already_following);
    }

    #[tokio::test]
    async fn test_refollow_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("bob")]])
            .append_exec_results([exec(0)])
            .into_connection();

        let outcome = service(db).follow("alice", "bob").await.unwrap();
        assert!(outcome.already_following);
    }

    #[tokio::test]
    async fn test_unfollow_when_not_following_is_ok() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("bob")]])
            .append_exec_results([exec(0)])
            .into_connection();

        assert!(service(db).unfollow("alice", "bob").await.is_ok());
    }
}
