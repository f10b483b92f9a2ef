//! Users endpoints: profiles, administration and the follow graph.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use opendraft_common::AppResult;
use opendraft_core::{AdminUpdateUserInput, PageRequest, UserStats};
use opendraft_db::entities::user::{self, UserRole};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AppJson, AuthUser, ValidQuery},
    middleware::AppState,
    response::ApiResponse,
};

/// Full user representation, for the user themself and admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub is_verified: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            bio: user.bio,
            avatar: user.avatar,
            role: user.role,
            is_verified: user.is_verified,
            last_login: user.last_login.map(|t| t.to_rfc3339()),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Public user card, embedded in posts, comments and follow lists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            avatar: user.avatar,
            bio: user.bio,
        }
    }
}

/// User with follow counts.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub followers_count: u64,
    pub following_count: u64,
}

impl From<UserStats> for UserStatsResponse {
    fn from(stats: UserStats) -> Self {
        Self {
            user: stats.user.into(),
            followers_count: stats.followers_count,
            following_count: stats.following_count,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UsersQuery {
    #[validate(range(min = 1, max = 100_000, message = "Page must be between 1 and 100000"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub already_following: bool,
}

/// List all users (admin).
async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<UsersQuery>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let page = state
        .user_service
        .list_users(&auth.actor(), PageRequest::new(query.page, query.limit))
        .await?;
    Ok(ApiResponse::paginated(page, UserResponse::from))
}

/// Get a user with follow counts (self or admin).
async fn show(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserStatsResponse>> {
    let stats = state.user_service.get_user(&auth.actor(), &id).await?;
    Ok(ApiResponse::ok(stats.into()))
}

/// Update a user (admin).
async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<AdminUpdateUserInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .user_service
        .admin_update_user(&auth.actor(), &id, input)
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Delete a user (admin, never oneself).
async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.delete_user(&auth.actor(), &id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

/// Change a user's role (admin, never one's own).
async fn update_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<RoleRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .user_service
        .update_role(&auth.actor(), &id, &req.role)
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let outcome = state.following_service.follow(&user.id, &id).await?;
    let message = if outcome.already_following {
        "Already following this user"
    } else {
        "User followed successfully"
    };

    Ok(ApiResponse::ok(FollowResponse {
        already_following: outcome.already_following,
    })
    .with_message(message))
}

async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.following_service.unfollow(&user.id, &id).await?;
    Ok(ApiResponse::message("User unfollowed successfully"))
}

async fn followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidQuery(query): ValidQuery<UsersQuery>,
) -> AppResult<ApiResponse<Vec<UserSummary>>> {
    let page = state
        .following_service
        .followers(&id, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(ApiResponse::paginated(page, UserSummary::from))
}

async fn following(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidQuery(query): ValidQuery<UsersQuery>,
) -> AppResult<ApiResponse<Vec<UserSummary>>> {
    let page = state
        .following_service
        .following(&id, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(ApiResponse::paginated(page, UserSummary::from))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/role", put(update_role))
        .route("/{id}/follow", post(follow).delete(unfollow))
        .route("/{id}/followers", get(followers))
        .route("/{id}/following", get(following))
}
