//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod following;
pub mod notification;
pub mod post;
pub mod report;
pub mod user;

pub use comment::{CommentService, CommentView, CreateCommentInput, UpdateCommentInput};
pub use following::{FollowOutcome, FollowingService};
pub use notification::{NotificationInbox, NotificationService};
pub use post::{
    CreatePostInput, ListPostsQuery, PostAnalytics, PostService, PostView, PublishReport,
    UpdatePostInput,
};
pub use report::{CreateReportInput, ReportService};
pub use user::{
    AdminUpdateUserInput, AuthSession, ChangePasswordInput, LoginInput, RegisterInput,
    UpdateProfileInput, UserService, UserStats,
};

use serde::{Deserialize, Deserializer};

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in patch inputs.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Validate emoji used in a reaction: 1-16 characters, no whitespace.
pub(crate) fn validate_emoji(emoji: &str) -> opendraft_common::AppResult<&str> {
    let emoji = emoji.trim();
    let len = emoji.chars().count();
    if len == 0 || len > 16 || emoji.chars().any(char::is_whitespace) {
        return Err(opendraft_common::AppError::Validation(
            "Emoji must be 1 to 16 characters without spaces".to_string(),
        ));
    }
    Ok(emoji)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_emoji() {
        assert_eq!(validate_emoji(" 👍 ").ok(), Some("👍"));
        assert!(validate_emoji("").is_err());
        assert!(validate_emoji("a b").is_err());
        assert!(validate_emoji(&"x".repeat(17)).is_err());
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        field: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap_or(Patch { field: Some(None) });
        assert_eq!(absent.field, None);
        let null: Patch = serde_json::from_str(r#"{"field":null}"#).unwrap_or(Patch { field: None });
        assert_eq!(null.field, Some(None));
        let set: Patch = serde_json::from_str(r#"{"field":"x"}"#).unwrap_or(Patch { field: None });
        assert_eq!(set.field, Some(Some("x".to_string())));
    }
}
