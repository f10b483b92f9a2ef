//! Notifications endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, put},
};
use opendraft_common::AppResult;
use opendraft_core::PageRequest;
use opendraft_db::entities::notification::{Model as NotificationModel, NotificationType};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthUser, ValidQuery},
    middleware::AppState,
    response::{ApiResponse, Pagination, pagination_of},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[validate(range(min = 1, max = 100_000, message = "Page must be between 1 and 100000"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u64>,
    #[serde(default)]
    pub unread_only: bool,
}

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub actor_id: Option<String>,
    pub data: serde_json::Value,
    pub is_read: bool,
    pub created_at: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            actor_id: n.actor_id,
            data: n.data,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// A page of notifications with the unread badge count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsListResponse {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListNotificationsQuery>,
) -> AppResult<ApiResponse<NotificationsListResponse>> {
    let inbox = state
        .notification_service
        .list(
            &user.id,
            query.unread_only,
            PageRequest::new(query.page, query.limit),
        )
        .await?;

    let pagination: Pagination = pagination_of(&inbox.page);
    let total = inbox.page.total;
    let notifications: Vec<NotificationResponse> = inbox
        .page
        .items
        .into_iter()
        .map(NotificationResponse::from)
        .collect();

    let mut response = ApiResponse::ok(NotificationsListResponse {
        notifications,
        unread_count: inbox.unread_count,
    });
    response.total = Some(total);
    response.pagination = Some(pagination);
    Ok(response)
}

/// Mark one of the caller's notifications read.
async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<NotificationResponse>> {
    let notification = state.notification_service.mark_read(&id, &user.id).await?;
    Ok(ApiResponse::ok(notification.into()))
}

async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllReadResponse>> {
    let updated = state.notification_service.mark_all_read(&user.id).await?;
    Ok(ApiResponse::ok(MarkAllReadResponse { updated })
        .with_message("All notifications marked as read"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/read-all", put(mark_all_read))
        .route("/{id}/read", put(mark_read))
}
