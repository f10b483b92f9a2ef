//! Comment service.

use std::collections::HashMap;

use chrono::Utc;
use opendraft_common::{AppError, AppResult, IdGenerator};
use opendraft_db::{
    entities::{
        comment::{self, CommentStatus},
        comment_like, comment_reaction,
        notification::NotificationType,
        post::PostStatus,
        user,
    },
    repositories::{CommentFilter, CommentRepository, PostRepository, ReactionMap, UserRepository},
};
use sea_orm::{ActiveEnum, Set};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::pagination::{Page, PageRequest};
use crate::policy::{Actor, Permission, authorize, is_allowed};
use crate::services::notification::NotificationService;
use crate::services::validate_emoji;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

/// A comment with its author, likers and reactions resolved.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: comment::Model,
    pub author: Option<user::Model>,
    pub likes: Vec<String>,
    pub reactions: ReactionMap,
}

/// Input for creating a comment or a reply.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(min = 1, message = "Post ID is required"))]
    pub post_id: String,

    #[validate(length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters"))]
    pub content: String,

    pub parent_id: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters"))]
    pub content: String,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a published post, optionally as a reply.
    ///
    /// Authors and admins are trusted and skip moderation.
    pub async fn create(&self, actor: &Actor, mut input: CreateCommentInput) -> AppResult<CommentView> {
        input.content = input.content.trim().to_string();
        input.validate()?;

        let post = self
            .post_repo
            .find_by_id(&input.post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        if post.status != PostStatus::Published {
            return Err(AppError::BadRequest(
                "Cannot comment on unpublished posts".to_string(),
            ));
        }

        let parent = match input.parent_id.as_deref().filter(|id| !id.is_empty()) {
            Some(parent_id) => {
                let parent = self
                    .comment_repo
                    .find_by_id(parent_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;
                if parent.post_id != post.id {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to a different post".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let status = if actor.is_staff() {
            CommentStatus::Approved
        } else {
            CommentStatus::Pending
        };

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            author_id: Set(actor.id.clone()),
            parent_id: Set(parent.as_ref().map(|p| p.id.clone())),
            content: Set(input.content),
            status: Set(status),
            is_edited: Set(false),
            edited_at: Set(None),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, post_id = %post.id, status = ?status, "Comment created");

        self.notification_service
            .notify(
                &post.author_id,
                &actor.id,
                NotificationType::Comment,
                json!({ "postId": post.id, "slug": post.slug, "commentId": comment.id }),
            )
            .await;

        if let Some(parent) = &parent {
            self.notification_service
                .notify(
                    &parent.author_id,
                    &actor.id,
                    NotificationType::Reply,
                    json!({ "postId": post.id, "commentId": comment.id, "parentId": parent.id }),
                )
                .await;
        }

        self.view(comment).await
    }

    /// Comments of a post, newest first.
    ///
    /// The public sees approved comments only. Authors and admins may
    /// filter by status and see everything when they don't.
    pub async fn get_comments(
        &self,
        post_id: &str,
        viewer: Option<&Actor>,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<CommentView>> {
        let post = self
            .post_repo
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let status = if viewer.is_some_and(|v| is_allowed(v, Permission::ViewHiddenComments, None)) {
            status.map(parse_status).transpose()?
        } else {
            Some(CommentStatus::Approved)
        };

        let filter = CommentFilter {
            post_id: Some(post.id),
            status,
        };
        self.page(&filter, page).await
    }

    /// A single comment. Hidden comments are visible to their author and
    /// to authors/admins.
    pub async fn get_comment(&self, id: &str, viewer: Option<&Actor>) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(id).await?;

        if !comment.is_public() {
            let actor = viewer.ok_or_else(|| {
                AppError::Forbidden("Not authorized to view this comment".to_string())
            })?;
            if actor.id != comment.author_id {
                authorize(actor, Permission::ViewHiddenComments, None)?;
            }
        }

        self.view(comment).await
    }

    /// Direct replies to a comment, oldest first.
    pub async fn get_replies(&self, id: &str, viewer: Option<&Actor>) -> AppResult<Vec<CommentView>> {
        let parent = self.comment_repo.get_by_id(id).await?;

        let status = if viewer.is_some_and(|v| is_allowed(v, Permission::ViewHiddenComments, None)) {
            None
        } else {
            Some(CommentStatus::Approved)
        };

        let replies = self.comment_repo.find_replies(&parent.id, status).await?;
        self.assemble(replies).await
    }

    /// Every comment across all posts (admin).
    pub async fn get_all_comments(
        &self,
        actor: &Actor,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<CommentView>> {
        authorize(actor, Permission::ViewAllComments, None)?;

        let filter = CommentFilter {
            post_id: None,
            status: status.map(parse_status).transpose()?,
        };
        self.page(&filter, page).await
    }

    /// Edit the content. Every edit re-stamps `edited_at`.
    pub async fn update(&self, actor: &Actor, id: &str, mut input: UpdateCommentInput) -> AppResult<CommentView> {
        input.content = input.content.trim().to_string();
        input.validate()?;

        let comment = self.comment_repo.get_by_id(id).await?;
        authorize(actor, Permission::EditComment, Some(&comment.author_id))?;

        let now = Utc::now();
        let mut active: comment::ActiveModel = comment.into();
        active.content = Set(input.content);
        active.is_edited = Set(true);
        active.edited_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));

        let comment = self.comment_repo.update(active).await?;
        tracing::info!(comment_id = %comment.id, actor_id = %actor.id, "Comment updated");

        self.view(comment).await
    }

    /// Delete a comment. Its replies cascade.
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        authorize(actor, Permission::DeleteComment, Some(&comment.author_id))?;

        self.comment_repo.delete(&comment.id).await?;
        tracing::info!(comment_id = %comment.id, actor_id = %actor.id, "Comment deleted");
        Ok(())
    }

    /// Set the moderation status.
    pub async fn moderate(&self, actor: &Actor, id: &str, status: &str) -> AppResult<CommentView> {
        authorize(actor, Permission::ModerateComment, None)?;
        let status = parse_status(status)?;

        let comment = self.comment_repo.get_by_id(id).await?;
        let mut active: comment::ActiveModel = comment.into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));

        let comment = self.comment_repo.update(active).await?;
        tracing::info!(comment_id = %comment.id, status = ?status, actor_id = %actor.id, "Comment moderated");

        self.view(comment).await
    }

    /// Like a comment. Returns the new like count.
    pub async fn like(&self, user_id: &str, comment_id: &str) -> AppResult<u64> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if self.comment_repo.is_liked(&comment.id, user_id).await? {
            return Err(AppError::Conflict("Comment already liked".to_string()));
        }

        let like = comment_like::ActiveModel {
            id: Set(self.id_gen.generate()),
            comment_id: Set(comment.id.clone()),
            user_id: Set(user_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        self.comment_repo.add_like(like).await?;

        self.notification_service
            .notify(
                &comment.author_id,
                user_id,
                NotificationType::Like,
                json!({ "commentId": comment.id, "postId": comment.post_id }),
            )
            .await;

        self.comment_repo.count_likes(&comment.id).await
    }

    /// Remove a like. Returns the new like count.
    pub async fn unlike(&self, user_id: &str, comment_id: &str) -> AppResult<u64> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if self.comment_repo.remove_like(&comment.id, user_id).await? == 0 {
            return Err(AppError::Conflict("Comment not liked".to_string()));
        }

        self.comment_repo.count_likes(&comment.id).await
    }

    /// Add the caller to an emoji bucket. Idempotent.
    pub async fn react(&self, user_id: &str, comment_id: &str, emoji: &str) -> AppResult<ReactionMap> {
        let emoji = validate_emoji(emoji)?;
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        let reaction = comment_reaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            comment_id: Set(comment.id.clone()),
            user_id: Set(user_id.to_string()),
            emoji: Set(emoji.to_string()),
            created_at: Set(Utc::now().into()),
        };

        if self.comment_repo.add_reaction(reaction).await? {
            self.notification_service
                .notify(
                    &comment.author_id,
                    user_id,
                    NotificationType::Reaction,
                    json!({ "commentId": comment.id, "postId": comment.post_id, "emoji": emoji }),
                )
                .await;
        }

        self.comment_repo.reactions_of(&comment.id).await
    }

    /// Remove the caller from an emoji bucket. Idempotent.
    pub async fn unreact(&self, user_id: &str, comment_id: &str, emoji: &str) -> AppResult<ReactionMap> {
        let emoji = validate_emoji(emoji)?;
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        self.comment_repo
            .remove_reaction(&comment.id, user_id, emoji)
            .await?;

        self.comment_repo.reactions_of(&comment.id).await
    }

    async fn page(&self, filter: &CommentFilter, page: PageRequest) -> AppResult<Page<CommentView>> {
        let comments = self
            .comment_repo
            .find_filtered(filter, page.offset(), page.limit)
            .await?;
        let total = self.comment_repo.count_filtered(filter).await?;
        let items = self.assemble(comments).await?;

        Ok(Page::new(items, total, page))
    }

    async fn view(&self, comment: comment::Model) -> AppResult<CommentView> {
        let id = comment.id.clone();
        self.assemble(vec![comment])
            .await?
            .pop()
            .ok_or_else(|| AppError::CommentNotFound(id))
    }

    async fn assemble(&self, comments: Vec<comment::Model>) -> AppResult<Vec<CommentView>> {
        let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let mut likes = self.comment_repo.likes_for(&ids).await?;
        let mut reactions = self.comment_repo.reactions_for(&ids).await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: authors.get(&comment.author_id).cloned(),
                likes: likes.remove(&comment.id).unwrap_or_default(),
                reactions: reactions.remove(&comment.id).unwrap_or_default(),
                comment,
            })
            .collect())
    }
}

fn parse_status(status: &str) -> AppResult<CommentStatus> {
    CommentStatus::try_from_value(&status.to_string()).map_err(|_| {
        AppError::Validation("Invalid status. Must be pending, approved, or rejected".to_string())
    })
}
