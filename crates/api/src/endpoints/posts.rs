//! Posts endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use opendraft_common::AppResult;
use opendraft_core::{
    CreatePostInput, ListPostsQuery, PageRequest, PostAnalytics, PostView, UpdatePostInput,
};
use opendraft_db::{entities::post::PostStatus, repositories::ReactionMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::{
    endpoints::{comments, users::UserSummary},
    extractors::{AppJson, AuthUser, MaybeAuthUser, ValidQuery},
    middleware::AppState,
    response::ApiResponse,
};

/// Post response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub status: PostStatus,
    pub scheduled_date: Option<String>,
    pub published_at: Option<String>,
    pub views: i64,
    pub read_time: i32,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub author_id: String,
    pub author: Option<UserSummary>,
    pub likes: Vec<String>,
    pub like_count: usize,
    pub reactions: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<PostView> for PostResponse {
    fn from(view: PostView) -> Self {
        let post = view.post;
        Self {
            tags: post.tag_list(),
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            featured_image: post.featured_image,
            category: post.category,
            status: post.status,
            scheduled_date: post.scheduled_date.map(|t| t.to_rfc3339()),
            published_at: post.published_at.map(|t| t.to_rfc3339()),
            views: post.views,
            read_time: post.read_time,
            seo_title: post.seo_title,
            seo_description: post.seo_description,
            author_id: post.author_id,
            author: view.author.map(UserSummary::from),
            like_count: view.likes.len(),
            likes: view.likes,
            reactions: reaction_lists(view.reactions),
            is_liked: view.is_liked,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Emoji buckets as JSON arrays of user ids.
pub fn reaction_lists(reactions: ReactionMap) -> BTreeMap<String, Vec<String>> {
    reactions
        .into_iter()
        .map(|(emoji, users)| (emoji, users.into_iter().collect()))
        .collect()
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostsQuery {
    #[validate(range(min = 1, max = 100_000, message = "Page must be between 1 and 100000"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u64>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    /// Only honoured by the admin listing.
    pub status: Option<String>,
}

impl PostsQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Author profile plus their posts.
#[derive(Serialize)]
pub struct AuthorPostsResponse {
    pub author: UserSummary,
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub like_count: u64,
}

/// Published posts, newest first.
async fn list(
    maybe_user: MaybeAuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PostsQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let page = state
        .post_service
        .list(
            ListPostsQuery {
                page: query.page_request(),
                category: query.category,
                tag: query.tag,
                author: query.author,
                search: query.search,
            },
            maybe_user.id(),
        )
        .await?;
    Ok(ApiResponse::paginated(page, PostResponse::from))
}

/// Every post in any status (admin).
async fn all(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PostsQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let page = state
        .post_service
        .all_posts(&auth.actor(), query.status.as_deref(), query.page_request())
        .await?;
    Ok(ApiResponse::paginated(page, PostResponse::from))
}

/// The caller's own posts, drafts included.
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PostsQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let page = state
        .post_service
        .my_posts(&user.id, query.page_request())
        .await?;
    Ok(ApiResponse::paginated(page, PostResponse::from))
}

async fn by_author(
    maybe_user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(author_id): Path<String>,
    ValidQuery(query): ValidQuery<PostsQuery>,
) -> AppResult<ApiResponse<AuthorPostsResponse>> {
    let (author, page) = state
        .post_service
        .by_author(&author_id, query.page_request(), maybe_user.id())
        .await?;

    let pagination = crate::response::pagination_of(&page);
    let total = page.total;
    let posts: Vec<PostResponse> = page.items.into_iter().map(PostResponse::from).collect();

    let mut response = ApiResponse::ok(AuthorPostsResponse {
        author: author.into(),
        posts,
    });
    response.total = Some(total);
    response.pagination = Some(pagination);
    Ok(response)
}

/// A published post by slug. Counts a view.
async fn show(
    maybe_user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let view = state
        .post_service
        .get_by_slug(&slug, maybe_user.id())
        .await?;
    Ok(ApiResponse::ok(view.into()))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let view = state.post_service.create(&user.id, input).await?;
    Ok(ApiResponse::created(view.into()))
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<UpdatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let view = state.post_service.update(&auth.actor(), &id, input).await?;
    Ok(ApiResponse::ok(view.into()))
}

async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.post_service.delete(&auth.actor(), &id).await?;
    Ok(ApiResponse::message("Post deleted successfully"))
}

async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeResponse>> {
    let like_count = state.post_service.like(&user.id, &id).await?;
    Ok(ApiResponse::ok(LikeResponse { like_count }).with_message("Post liked successfully"))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeResponse>> {
    let like_count = state.post_service.unlike(&user.id, &id).await?;
    Ok(ApiResponse::ok(LikeResponse { like_count }).with_message("Post unliked successfully"))
}

async fn react(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactionRequest>,
) -> AppResult<ApiResponse<BTreeMap<String, Vec<String>>>> {
    let reactions = state.post_service.react(&user.id, &id, &req.emoji).await?;
    Ok(ApiResponse::ok(reaction_lists(reactions)))
}

async fn unreact(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactionRequest>,
) -> AppResult<ApiResponse<BTreeMap<String, Vec<String>>>> {
    let reactions = state
        .post_service
        .unreact(&user.id, &id, &req.emoji)
        .await?;
    Ok(ApiResponse::ok(reaction_lists(reactions)))
}

async fn analytics(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostAnalytics>> {
    let analytics = state.post_service.analytics(&auth.actor(), &id).await?;
    Ok(ApiResponse::ok(analytics))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/all", get(all))
        .route("/me/posts", get(mine))
        .route("/author/{author_id}", get(by_author))
        // GET takes a slug, PUT and DELETE an id.
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/like", post(like).delete(unlike))
        .route("/{id}/reaction", post(react).delete(unreact))
        .route("/{id}/analytics", get(analytics))
        .route("/{id}/comments", get(comments::list_for_post))
}
