//! Notification service.

use chrono::Utc;
use opendraft_common::{AppError, AppResult, IdGenerator};
use opendraft_db::{
    entities::notification::{self, NotificationType},
    repositories::NotificationRepository,
};
use sea_orm::Set;
use serde_json::Value;

use crate::pagination::{Page, PageRequest};

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

/// A page of notifications plus the recipient's unread count.
#[derive(Debug, Clone)]
pub struct NotificationInbox {
    pub page: Page<notification::Model>,
    pub unread_count: u64,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Build an unsaved notification row.
    #[must_use]
    pub fn build(
        &self,
        recipient_id: &str,
        actor_id: &str,
        kind: NotificationType,
        data: Value,
    ) -> notification::ActiveModel {
        notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(recipient_id.to_string()),
            actor_id: Set(Some(actor_id.to_string())),
            notification_type: Set(kind),
            data: Set(data),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        }
    }

    /// Record a notification as a side effect of another action.
    ///
    /// Never notifies the actor about their own action. A failure is logged
    /// and swallowed so the triggering request still succeeds.
    pub async fn notify(
        &self,
        recipient_id: &str,
        actor_id: &str,
        kind: NotificationType,
        data: Value,
    ) {
        if recipient_id == actor_id {
            return;
        }

        let model = self.build(recipient_id, actor_id, kind, data);
        if let Err(e) = self.notification_repo.create(model).await {
            tracing::warn!(
                error = %e,
                recipient_id,
                kind = ?kind,
                "Failed to create notification"
            );
        }
    }

    /// List the caller's notifications, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<NotificationInbox> {
        let items = self
            .notification_repo
            .find_by_user(user_id, unread_only, page.offset(), page.limit)
            .await?;
        let total = self
            .notification_repo
            .count_by_user(user_id, unread_only)
            .await?;
        let unread_count = if unread_only {
            total
        } else {
            self.notification_repo.count_by_user(user_id, true).await?
        };

        Ok(NotificationInbox {
            page: Page::new(items, total, page),
            unread_count,
        })
    }

    /// Mark one of the caller's notifications read.
    ///
    /// The update is scoped to the owner, so another user's notification id
    /// is reported as not found.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<notification::Model> {
        let updated = self.notification_repo.mark_read(id, user_id).await?;
        if updated == 0 {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }

        self.notification_repo
            .find_owned(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    /// Mark all of the caller's notifications read.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_read(user_id).await
    }
}
