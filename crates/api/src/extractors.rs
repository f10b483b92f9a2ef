//! Request extractors.
//!
//! Rejections are `AppError`s so that malformed input gets the same JSON
//! envelope as every other failure.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use opendraft_common::AppError;
use opendraft_core::Actor;
use opendraft_db::entities::user;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl AuthUser {
    /// The user as a policy subject.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl MaybeAuthUser {
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(Actor::from)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// JSON body extractor with an enveloped 400 on malformed input.
#[derive(Debug, Clone)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor that also runs `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct PageQuery {
        #[validate(range(min = 1))]
        page: Option<u64>,
    }

    async fn query(uri: &str) -> Result<ValidQuery<PageQuery>, AppError> {
        let (mut parts, ()) = HttpRequest::builder().uri(uri).body(()).unwrap().into_parts();
        ValidQuery::<PageQuery>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_query() {
        let ValidQuery(q) = query("/posts?page=2").await.unwrap();
        assert_eq!(q.page, Some(2));
    }

    #[tokio::test]
    async fn test_query_rule_violation_is_validation_error() {
        assert!(matches!(query("/posts?page=0").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_malformed_query_is_bad_request() {
        assert!(matches!(query("/posts?page=abc").await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let (mut parts, ()) = HttpRequest::builder().uri("/").body(()).unwrap().into_parts();
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
