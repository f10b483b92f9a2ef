//! User service: registration, sessions, profiles and user administration.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use opendraft_common::{AppError, AppResult, IdGenerator};
use opendraft_db::{
    entities::user::{self, UserRole},
    repositories::{FollowingRepository, UserRepository},
};
use sea_orm::{ActiveEnum, Set};
use serde::Deserialize;
use validator::Validate;

use crate::pagination::{Page, PageRequest};
use crate::policy::{Actor, Permission, authorize};

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    id_gen: IdGenerator,
}

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: user::Model,
    pub token: String,
}

/// A user with follow graph counts.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub user: user::Model,
    pub followers_count: u64,
    pub following_count: u64,
}

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Input for updating one's own profile.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Bio cannot be more than 500 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,
}

/// Input for changing one's password.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

/// Input for an administrator editing another account.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserInput {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    #[validate(length(max = 500, message = "Bio cannot be more than 500 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,

    pub is_verified: Option<bool>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, following_repo: FollowingRepository) -> Self {
        Self {
            user_repo,
            following_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new reader account and open a session for it.
    pub async fn register(&self, mut input: RegisterInput) -> AppResult<AuthSession> {
        input.name = input.name.trim().to_string();
        input.email = input.email.trim().to_lowercase();
        input.validate()?;

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            email: Set(input.email),
            password_hash: Set(password_hash),
            token: Set(Some(token.clone())),
            role: Set(UserRole::Reader),
            is_verified: Set(false),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(AuthSession { user, token })
    }

    /// Verify credentials, rotate the bearer token and stamp `last_login`.
    pub async fn login(&self, mut input: LoginInput) -> AppResult<AuthSession> {
        input.email = input.email.trim().to_lowercase();
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.id_gen.generate_token();
        let now = Utc::now();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token.clone()));
        active.last_login = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));

        let user = self.user_repo.update(active).await?;
        tracing::debug!(user_id = %user.id, "User logged in");

        Ok(AuthSession { user, token })
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Invalidate the current bearer token.
    pub async fn logout(&self, user: user::Model) -> AppResult<()> {
        self.user_repo.set_token(user, None).await?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Update the caller's own profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        mut input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.name = input.name.map(|n| n.trim().to_string());
        input.bio = input.bio.map(|b| b.trim().to_string());
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar) = input.avatar {
            active.avatar = Set(Some(avatar));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Change the caller's password after checking the current one.
    pub async fn change_password(&self, user_id: &str, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// A user profile with follow counts; visible to the user and admins.
    pub async fn get_user(&self, actor: &Actor, id: &str) -> AppResult<UserStats> {
        let user = self.user_repo.get_by_id(id).await?;
        authorize(actor, Permission::ViewProfile, Some(&user.id))?;

        let followers_count = self.following_repo.count_followers(id).await?;
        let following_count = self.following_repo.count_following(id).await?;

        Ok(UserStats {
            user,
            followers_count,
            following_count,
        })
    }

    /// List all users (admin).
    pub async fn list_users(&self, actor: &Actor, page: PageRequest) -> AppResult<Page<user::Model>> {
        authorize(actor, Permission::ManageUsers, None)?;

        let users = self
            .user_repo
            .find_paginated(page.offset(), page.limit)
            .await?;
        let total = self.user_repo.count().await?;

        Ok(Page::new(users, total, page))
    }

    /// Edit another account (admin).
    pub async fn admin_update_user(
        &self,
        actor: &Actor,
        id: &str,
        mut input: AdminUpdateUserInput,
    ) -> AppResult<user::Model> {
        authorize(actor, Permission::ManageUsers, None)?;
        input.name = input.name.map(|n| n.trim().to_string());
        input.email = input.email.map(|e| e.trim().to_lowercase());
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar) = input.avatar {
            active.avatar = Set(Some(avatar));
        }
        if let Some(is_verified) = input.is_verified {
            active.is_verified = Set(is_verified);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Delete an account and everything it owns (admin, never oneself).
    pub async fn delete_user(&self, actor: &Actor, id: &str) -> AppResult<()> {
        authorize(actor, Permission::ManageUsers, None)?;

        let user = self.user_repo.get_by_id(id).await?;
        if user.id == actor.id {
            return Err(AppError::BadRequest(
                "Cannot delete your own account".to_string(),
            ));
        }

        self.user_repo.delete(&user.id).await?;
        tracing::info!(admin_id = %actor.id, user_id = %user.id, "User deleted");
        Ok(())
    }

    /// Change the role of another account (admin, never oneself).
    pub async fn update_role(&self, actor: &Actor, id: &str, role: &str) -> AppResult<user::Model> {
        authorize(actor, Permission::ManageUsers, None)?;

        let role = UserRole::try_from_value(&role.to_string()).map_err(|_| {
            AppError::Validation("Invalid role. Must be reader, author, or admin".to_string())
        })?;

        if id == actor.id {
            return Err(AppError::BadRequest("Cannot change your own role".to_string()));
        }

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Some(Utc::now().into()));

        let user = self.user_repo.update(active).await?;
        tracing::info!(admin_id = %actor.id, user_id = %user.id, role = ?user.role, "User role changed");
        Ok(user)
    }
}

/// Hash a password with Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, role: UserRole, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Test User".to_string(),
            email: format!("{id}@example.com"),
            password_hash: hash_password(password).unwrap(),
            token: Some("test_token".to_string()),
            bio: None,
            avatar: None,
            role,
            is_verified: false,
            last_login: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection) -> UserService {
        let db = Arc::new(db);
        UserService::new(
            UserRepository::new(Arc::clone(&db)),
            FollowingRepository::new(db),
        )
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let existing = create_test_user("u1", UserRole::Reader, "secret123");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing]])
            .into_connection();

        let result = service(db)
            .register(RegisterInput {
                name: "Alice".to_string(),
                email: "U1@Example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await;

        match result {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "User already exists"),
            _ => panic!("Expected Conflict"),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_short_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db)
            .register(RegisterInput {
                name: "  A ".to_string(),
                email: "a@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("u1", UserRole::Reader, "secret123");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .into_connection();

        let result = service(db)
            .login(LoginInput {
                email: "u1@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_normalizes_email() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = UserService::new(
            UserRepository::new(Arc::clone(&db)),
            FollowingRepository::new(Arc::clone(&db)),
        );

        // Padding and case are accepted the same way registration accepts them.
        let result = service
            .login(LoginInput {
                email: "  U1@Example.com ".to_string(),
                password: "secret123".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        drop(service);

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let lookup = format!("{:?}", log[0]);
        assert!(lookup.contains(r#"String(Some("u1@example.com"))"#), "{lookup}");
    }

    #[tokio::test]
    async fn test_login_rotates_token() {
        let user = create_test_user("u1", UserRole::Reader, "secret123");
        let mut updated = user.clone();
        updated.token = Some("rotated".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .append_query_results([[updated]])
            .into_connection();

        let session = service(db)
            .login(LoginInput {
                email: "u1@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();

        assert_ne!(session.token, "test_token");
        assert_eq!(session.user.id, "u1");
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).authenticate_by_token("bogus").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_admin_cannot_change_own_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let admin = Actor::new("admin1", UserRole::Admin);

        let result = service(db).update_role(&admin, "admin1", "reader").await;

        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Cannot change your own role"),
            _ => panic!("Expected BadRequest"),
        }
    }

    #[tokio::test]
    async fn test_update_role_rejects_unknown_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let admin = Actor::new("admin1", UserRole::Admin);

        let result = service(db).update_role(&admin, "u2", "superuser").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let admin_user = create_test_user("admin1", UserRole::Admin, "secret123");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin_user]])
            .into_connection();
        let admin = Actor::new("admin1", UserRole::Admin);

        let result = service(db).delete_user(&admin, "admin1").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_reader_cannot_view_other_profile() {
        let other = create_test_user("u2", UserRole::Reader, "secret123");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[other]])
            .into_connection();
        let reader = Actor::new("u1", UserRole::Reader);

        let result = service(db).get_user(&reader, "u2").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
