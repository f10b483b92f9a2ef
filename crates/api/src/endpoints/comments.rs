//! Comments endpoints.

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use opendraft_common::AppResult;
use opendraft_core::{CommentView, CreateCommentInput, PageRequest, UpdateCommentInput};
use opendraft_db::entities::comment::CommentStatus;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    endpoints::{
        posts::{LikeResponse, ReactionRequest, reaction_lists},
        users::UserSummary,
    },
    extractors::{AppJson, AuthUser, MaybeAuthUser, ValidQuery},
    middleware::AppState,
    response::ApiResponse,
};

/// Comment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub status: CommentStatus,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub author_id: String,
    pub author: Option<UserSummary>,
    pub likes: Vec<String>,
    pub like_count: usize,
    pub reactions: BTreeMap<String, Vec<String>>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        let comment = view.comment;
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            content: comment.content,
            status: comment.status,
            is_edited: comment.is_edited,
            edited_at: comment.edited_at.map(|t| t.to_rfc3339()),
            author_id: comment.author_id,
            author: view.author.map(UserSummary::from),
            like_count: view.likes.len(),
            likes: view.likes,
            reactions: reaction_lists(view.reactions),
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentsQuery {
    #[validate(range(min = 1, max = 100_000, message = "Page must be between 1 and 100000"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u64>,
    /// Ignored for readers, who only ever see approved comments.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    pub status: String,
}

/// Comments of a post. Also mounted as `GET /posts/{id}/comments`.
pub async fn list_for_post(
    maybe_user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ValidQuery(query): ValidQuery<CommentsQuery>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let page = state
        .comment_service
        .get_comments(
            &post_id,
            maybe_user.actor().as_ref(),
            query.status.as_deref(),
            PageRequest::new(query.page, query.limit),
        )
        .await?;
    Ok(ApiResponse::paginated(page, CommentResponse::from))
}

/// Every comment (admin).
async fn all(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<CommentsQuery>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let page = state
        .comment_service
        .get_all_comments(
            &auth.actor(),
            query.status.as_deref(),
            PageRequest::new(query.page, query.limit),
        )
        .await?;
    Ok(ApiResponse::paginated(page, CommentResponse::from))
}

async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state.comment_service.create(&auth.actor(), input).await?;
    Ok(ApiResponse::created(view.into()))
}

async fn show(
    maybe_user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state
        .comment_service
        .get_comment(&id, maybe_user.actor().as_ref())
        .await?;
    Ok(ApiResponse::ok(view.into()))
}

async fn replies(
    maybe_user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let replies = state
        .comment_service
        .get_replies(&id, maybe_user.actor().as_ref())
        .await?;
    Ok(ApiResponse::list(
        replies.into_iter().map(CommentResponse::from).collect(),
    ))
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<UpdateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state
        .comment_service
        .update(&auth.actor(), &id, input)
        .await?;
    Ok(ApiResponse::ok(view.into()))
}

async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.delete(&auth.actor(), &id).await?;
    Ok(ApiResponse::message("Comment deleted successfully"))
}

async fn moderate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ModerateRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state
        .comment_service
        .moderate(&auth.actor(), &id, &req.status)
        .await?;
    Ok(ApiResponse::ok(view.into()))
}

async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeResponse>> {
    let like_count = state.comment_service.like(&user.id, &id).await?;
    Ok(ApiResponse::ok(LikeResponse { like_count }).with_message("Comment liked successfully"))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeResponse>> {
    let like_count = state.comment_service.unlike(&user.id, &id).await?;
    Ok(ApiResponse::ok(LikeResponse { like_count }).with_message("Comment unliked successfully"))
}

async fn react(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactionRequest>,
) -> AppResult<ApiResponse<BTreeMap<String, Vec<String>>>> {
    let reactions = state
        .comment_service
        .react(&user.id, &id, &req.emoji)
        .await?;
    Ok(ApiResponse::ok(reaction_lists(reactions)))
}

async fn unreact(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactionRequest>,
) -> AppResult<ApiResponse<BTreeMap<String, Vec<String>>>> {
    let reactions = state
        .comment_service
        .unreact(&user.id, &id, &req.emoji)
        .await?;
    Ok(ApiResponse::ok(reaction_lists(reactions)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/all", get(all))
        .route("/post/{post_id}", get(list_for_post))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/replies", get(replies))
        .route("/{id}/moderate", put(moderate))
        .route("/{id}/like", post(like).delete(unlike))
        .route("/{id}/reaction", post(react).delete(unreact))
}
