//! Authorization policy.
//!
//! Every ownership and role check in the services goes through
//! [`authorize`], so the rules live in one table.

use opendraft_common::{AppError, AppResult};
use opendraft_db::entities::user::{self, UserRole};

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: UserRole,
}

impl Actor {
    #[must_use]
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Authors and admins: trusted for comment moderation.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Author | UserRole::Admin)
    }
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self::new(user.id.clone(), user.role)
    }
}

/// Guarded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    EditPost,
    DeletePost,
    ViewPostAnalytics,
    EditComment,
    DeleteComment,
    ModerateComment,
    ViewHiddenComments,
    ViewProfile,
    ManageUsers,
    ManageReports,
    ViewAllPosts,
    ViewAllComments,
}

impl Permission {
    const fn denial(self) -> &'static str {
        match self {
            Self::EditPost => "Not authorized to update this post",
            Self::DeletePost => "Not authorized to delete this post",
            Self::ViewPostAnalytics => "Not authorized to view analytics for this post",
            Self::EditComment => "Not authorized to update this comment",
            Self::DeleteComment => "Not authorized to delete this comment",
            Self::ModerateComment => "Not authorized to moderate comments",
            Self::ViewHiddenComments => "Not authorized to view this comment",
            Self::ViewProfile => "Not authorized to access this user",
            Self::ManageUsers
            | Self::ManageReports
            | Self::ViewAllPosts
            | Self::ViewAllComments => "Admin access required",
        }
    }
}

/// Whether `actor` holds `permission` on a resource owned by `owner_id`.
#[must_use]
pub fn is_allowed(actor: &Actor, permission: Permission, owner_id: Option<&str>) -> bool {
    let owns = owner_id.is_some_and(|owner| owner == actor.id);

    match permission {
        Permission::EditPost
        | Permission::DeletePost
        | Permission::ViewPostAnalytics
        | Permission::ViewProfile => owns || actor.is_admin(),
        Permission::EditComment | Permission::DeleteComment => owns || actor.is_staff(),
        Permission::ModerateComment | Permission::ViewHiddenComments => actor.is_staff(),
        Permission::ManageUsers
        | Permission::ManageReports
        | Permission::ViewAllPosts
        | Permission::ViewAllComments => actor.is_admin(),
    }
}

/// Fail with `Forbidden` unless [`is_allowed`].
pub fn authorize(actor: &Actor, permission: Permission, owner_id: Option<&str>) -> AppResult<()> {
    if is_allowed(actor, permission, owner_id) {
        Ok(())
    } else {
        tracing::debug!(actor = %actor.id, ?permission, "Permission denied");
        Err(AppError::Forbidden(permission.denial().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> Actor {
        Actor::new("reader", UserRole::Reader)
    }

    fn author() -> Actor {
        Actor::new("author", UserRole::Author)
    }

    fn admin() -> Actor {
        Actor::new("admin", UserRole::Admin)
    }

    #[test]
    fn test_post_edit_is_owner_or_admin() {
        assert!(is_allowed(&author(), Permission::EditPost, Some("author")));
        assert!(is_allowed(&admin(), Permission::EditPost, Some("author")));
        assert!(!is_allowed(&reader(), Permission::EditPost, Some("author")));
        // Another author is not enough.
        let other = Actor::new("other", UserRole::Author);
        assert!(!is_allowed(&other, Permission::DeletePost, Some("author")));
    }

    #[test]
    fn test_comment_edit_is_owner_or_staff() {
        assert!(is_allowed(&reader(), Permission::EditComment, Some("reader")));
        assert!(is_allowed(&author(), Permission::DeleteComment, Some("reader")));
        let stranger = Actor::new("stranger", UserRole::Reader);
        assert!(!is_allowed(&stranger, Permission::EditComment, Some("reader")));
    }

    #[test]
    fn test_moderation_needs_staff() {
        assert!(!is_allowed(&reader(), Permission::ModerateComment, None));
        assert!(is_allowed(&author(), Permission::ModerateComment, None));
        assert!(is_allowed(&admin(), Permission::ViewHiddenComments, None));
    }

    #[test]
    fn test_admin_only_permissions_ignore_ownership() {
        let me = reader();
        assert!(!is_allowed(&me, Permission::ManageUsers, Some("reader")));
        assert!(!is_allowed(&author(), Permission::ManageReports, None));
        assert!(is_allowed(&admin(), Permission::ViewAllPosts, None));
    }

    #[test]
    fn test_authorize_returns_forbidden() {
        match authorize(&reader(), Permission::ManageReports, None) {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "Admin access required"),
            _ => panic!("Expected Forbidden"),
        }
        assert!(authorize(&admin(), Permission::ManageReports, None).is_ok());
    }
}
