//! Authentication endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
use opendraft_common::AppResult;
use opendraft_core::{AuthSession, ChangePasswordInput, LoginInput, RegisterInput, UpdateProfileInput};
use serde::Serialize;

use crate::{
    endpoints::users::UserResponse,
    extractors::{AppJson, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Session response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: session.user.into(),
        }
    }
}

/// Create a new reader account.
async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let session = state.user_service.register(input).await?;
    Ok(ApiResponse::created(session.into()))
}

async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let session = state.user_service.login(input).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Invalidate the current token.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.logout(user).await?;
    Ok(ApiResponse::message("User logged out successfully"))
}

async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(user.into())
}

async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.update_profile(&user.id, input).await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<ChangePasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.change_password(&user.id, input).await?;
    Ok(ApiResponse::message("Password updated successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route("/change-password", put(change_password))
}
