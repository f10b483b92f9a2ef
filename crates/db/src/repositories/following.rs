//! Following repository.
//!
//! A single `following` row is both "B in A.following" and "A in
//! B.followers", so the two views cannot drift apart.

use std::sync::Arc;

use crate::entities::{Following, User, following, notification, user};
use opendraft_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait, sea_query::OnConflict,
};

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a follow edge and its notification in one transaction.
    ///
    /// The edge insert is `ON CONFLICT DO NOTHING`; the notification is only
    /// written when a new edge was actually created. Returns whether it was.
    pub async fn create_with_notification(
        &self,
        edge: following::ActiveModel,
        notification: notification::ActiveModel,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let inserted = Following::insert(edge)
            .on_conflict(
                OnConflict::columns([
                    following::Column::FollowerId,
                    following::Column::FolloweeId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted > 0 {
            notification
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Delete a follow edge. Returns the number of rows removed.
    pub async fn delete_by_pair(&self, follower_id: &str, followee_id: &str) -> AppResult<u64> {
        Following::delete_many()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users following `user_id`, most recent first.
    pub async fn find_followers(
        &self,
        user_id: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .join_rev(JoinType::InnerJoin, following::Relation::Follower.def())
            .filter(following::Column::FolloweeId.eq(user_id))
            .order_by_desc(following::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users that `user_id` follows, most recent first.
    pub async fn find_following(
        &self,
        user_id: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .join_rev(JoinType::InnerJoin, following::Relation::Followee.def())
            .filter(following::Column::FollowerId.eq(user_id))
            .order_by_desc(following::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::FolloweeId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count following of a user.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set, Value};

    fn edge() -> following::ActiveModel {
        following::ActiveModel {
            id: Set("f1".to_string()),
            follower_id: Set("alice".to_string()),
            followee_id: Set("bob".to_string()),
            created_at: Set(Utc::now().into()),
        }
    }

    fn follow_notification() -> notification::Model {
        notification::Model {
            id: "n1".to_string(),
            user_id: "bob".to_string(),
            actor_id: Some("alice".to_string()),
            notification_type: NotificationType::Follow,
            data: serde_json::json!({ "followerId": "alice" }),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_new_edge_writes_notification() {
        let notification = follow_notification();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[notification.clone()]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        let created = repo
            .create_with_notification(edge(), notification.into())
            .await
            .unwrap();

        assert!(created);
    }

    #[tokio::test]
    async fn test_existing_edge_skips_notification() {
        // No query result is queued: a notification insert would fail.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        let created = repo
            .create_with_notification(edge(), follow_notification().into())
            .await
            .unwrap();

        assert!(!created);
    }

    #[tokio::test]
    async fn test_count_followers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => Value::BigInt(Some(5))
                }]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert_eq!(repo.count_followers("bob").await.unwrap(), 5);
    }
}
