//! Comment repository.
//!
//! Comments form an adjacency list through `parent_id`; replies of a
//! comment are fetched with [`CommentRepository::find_replies`].

use std::sync::Arc;

use super::{LikeMap, ReactionMap, ReactionsByTarget, group_likes, group_reactions};
use crate::entities::{
    Comment, CommentLike, CommentReaction, comment, comment::CommentStatus, comment_like,
    comment_reaction,
};
use crate::is_unique_violation;
use opendraft_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::OnConflict,
};

/// Filters for comment listings.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post_id: Option<String>,
    pub status: Option<CommentStatus>,
}

impl CommentFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(post_id) = &self.post_id {
            cond = cond.add(comment::Column::PostId.eq(post_id.as_str()));
        }
        if let Some(status) = self.status {
            cond = cond.add(comment::Column::Status.eq(status));
        }
        cond
    }
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound(id.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment. Replies, likes and reactions go with it.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List comments matching a filter, newest first.
    pub async fn find_filtered(
        &self,
        filter: &CommentFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(filter.condition())
            .order_by_desc(comment::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments matching a filter.
    pub async fn count_filtered(&self, filter: &CommentFilter) -> AppResult<u64> {
        Comment::find()
            .filter(filter.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Direct replies of a comment, oldest first.
    pub async fn find_replies(
        &self,
        parent_id: &str,
        status: Option<CommentStatus>,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find().filter(comment::Column::ParentId.eq(parent_id));

        if let Some(status) = status {
            query = query.filter(comment::Column::Status.eq(status));
        }

        query
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Likes ====================

    /// Check whether a user has liked a comment.
    pub async fn is_liked(&self, comment_id: &str, user_id: &str) -> AppResult<bool> {
        let like = CommentLike::find()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .filter(comment_like::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(like.is_some())
    }

    /// Insert a like. A second like by the same user is a conflict.
    pub async fn add_like(&self, model: comment_like::ActiveModel) -> AppResult<()> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Comment already liked".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;
        Ok(())
    }

    /// Remove a like, returning the number of rows deleted.
    pub async fn remove_like(&self, comment_id: &str, user_id: &str) -> AppResult<u64> {
        CommentLike::delete_many()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .filter(comment_like::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes on a comment.
    pub async fn count_likes(&self, comment_id: &str) -> AppResult<u64> {
        CommentLike::find()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Likers of each comment.
    pub async fn likes_for(&self, comment_ids: &[String]) -> AppResult<LikeMap> {
        if comment_ids.is_empty() {
            return Ok(LikeMap::new());
        }

        let likes = CommentLike::find()
            .filter(comment_like::Column::CommentId.is_in(comment_ids.to_vec()))
            .order_by_asc(comment_like::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group_likes(
            likes.into_iter().map(|l| (l.comment_id, l.user_id)),
        ))
    }

    // ==================== Reactions ====================

    /// Add a reaction. Returns false if the user already held this emoji.
    pub async fn add_reaction(&self, model: comment_reaction::ActiveModel) -> AppResult<bool> {
        let inserted = CommentReaction::insert(model)
            .on_conflict(
                OnConflict::columns([
                    comment_reaction::Column::CommentId,
                    comment_reaction::Column::UserId,
                    comment_reaction::Column::Emoji,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(inserted > 0)
    }

    /// Remove a reaction. Returns false if the user did not hold it.
    pub async fn remove_reaction(
        &self,
        comment_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<bool> {
        let res = CommentReaction::delete_many()
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .filter(comment_reaction::Column::Emoji.eq(emoji))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(res.rows_affected > 0)
    }

    /// Reaction maps of several comments.
    pub async fn reactions_for(&self, comment_ids: &[String]) -> AppResult<ReactionsByTarget> {
        if comment_ids.is_empty() {
            return Ok(ReactionsByTarget::new());
        }

        let reactions = CommentReaction::find()
            .filter(comment_reaction::Column::CommentId.is_in(comment_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group_reactions(
            reactions
                .into_iter()
                .map(|r| (r.comment_id, r.user_id, r.emoji)),
        ))
    }

    /// Reaction map of a single comment.
    pub async fn reactions_of(&self, comment_id: &str) -> AppResult<ReactionMap> {
        let mut all = self.reactions_for(&[comment_id.to_string()]).await?;
        Ok(all.remove(comment_id).unwrap_or_default())
    }
}
