//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use opendraft_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, sea_query::Expr,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn inbox(user_id: &str, unread_only: bool) -> Select<Notification> {
        let query = Notification::find().filter(notification::Column::UserId.eq(user_id));
        if unread_only {
            query.filter(notification::Column::IsRead.eq(false))
        } else {
            query
        }
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a notification only if it belongs to `user_id`.
    pub async fn find_owned(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Notifications of a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        unread_only: bool,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<notification::Model>> {
        Self::inbox(user_id, unread_only)
            .order_by_desc(notification::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count notifications of a user.
    pub async fn count_by_user(&self, user_id: &str, unread_only: bool) -> AppResult<u64> {
        Self::inbox(user_id, unread_only)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark one notification read, but only if it belongs to `user_id`.
    ///
    /// Returns the number of rows updated.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<u64> {
        Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark every unread notification of a user read.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
