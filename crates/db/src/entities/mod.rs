//! Database entities.

pub mod comment;
pub mod comment_like;
pub mod comment_reaction;
pub mod following;
pub mod notification;
pub mod post;
pub mod post_like;
pub mod post_reaction;
pub mod report;
pub mod user;

pub use comment::Entity as Comment;
pub use comment_like::Entity as CommentLike;
pub use comment_reaction::Entity as CommentReaction;
pub use following::Entity as Following;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use post_like::Entity as PostLike;
pub use post_reaction::Entity as PostReaction;
pub use report::Entity as Report;
pub use user::Entity as User;
