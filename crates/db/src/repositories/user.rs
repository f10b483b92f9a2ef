//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use crate::is_unique_violation;
use opendraft_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by e-mail address (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by bearer token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already in use".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Replace (or clear) the bearer token of a user.
    pub async fn set_token(&self, user: user::Model, token: Option<String>) -> AppResult<user::Model> {
        let mut active: user::ActiveModel = user.into();
        active.token = Set(token);
        self.update(active).await
    }

    /// Delete a user. Owned rows are removed by foreign key cascade.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        User::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List users, newest first.
    pub async fn find_paginated(&self, offset: u64, limit: u64) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by_desc(user::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all users.
    pub async fn count(&self) -> AppResult<u64> {
        User::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn create_test_user(id: &str, email: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            token: Some("test_token".to_string()),
            bio: None,
            avatar: None,
            role: UserRole::Reader,
            is_verified: false,
            last_login: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "a@example.com");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().email, "a@example.com");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("nonexistent").await;

        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "nonexistent"),
            _ => panic!("Expected UserNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_token() {
        let user = create_test_user("user1", "a@example.com");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_token("test_token").await.unwrap();

        assert_eq!(result.unwrap().id, "user1");
    }

    #[tokio::test]
    async fn test_delete_returns_rows_affected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert_eq!(repo.delete("user1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
