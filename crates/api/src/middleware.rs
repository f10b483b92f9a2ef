//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use opendraft_core::{
    CommentService, FollowingService, NotificationService, PostService, ReportService, UserService,
};
use opendraft_db::repositories::{
    CommentRepository, FollowingRepository, NotificationRepository, PostRepository,
    ReportRepository, UserRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub following_service: FollowingService,
    pub notification_service: NotificationService,
    pub report_service: ReportService,
}

impl AppState {
    /// Wire every repository and service onto one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let following_repo = FollowingRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let report_repo = ReportRepository::new(db);

        let notification_service = NotificationService::new(notification_repo);
        let user_service = UserService::new(user_repo.clone(), following_repo.clone());
        let post_service = PostService::new(
            post_repo.clone(),
            user_repo.clone(),
            comment_repo.clone(),
            notification_service.clone(),
        );
        let comment_service = CommentService::new(
            comment_repo,
            post_repo,
            user_repo.clone(),
            notification_service.clone(),
        );
        let following_service =
            FollowingService::new(following_repo, user_repo, notification_service.clone());
        let report_service = ReportService::new(report_repo);

        Self {
            user_service,
            post_service,
            comment_service,
            following_service,
            notification_service,
            report_service,
        }
    }
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token to its user and stores it in the request
/// extensions. Missing or unknown tokens leave the request anonymous; the
/// extractors decide whether that is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
            }
        }
    }

    next.run(req).await
}
