//! Post repository.
//!
//! Besides the post rows themselves this repository owns the `post_like`
//! and `post_reaction` join tables. Set membership is enforced by their
//! unique indexes.

use std::sync::Arc;

use super::{LikeMap, ReactionMap, ReactionsByTarget, group_likes, group_reactions};
use crate::entities::{Post, PostLike, PostReaction, post, post::PostStatus, post_like, post_reaction};
use crate::is_unique_violation;
use chrono::{DateTime, Utc};
use opendraft_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func, OnConflict},
};

/// Filters for post listings. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author_id: Option<String>,
    pub category: Option<String>,
    /// Tag membership.
    pub tag: Option<String>,
    /// Case-insensitive substring over title, content and tags.
    pub search: Option<String>,
}

impl PostFilter {
    /// Public listing: published posts only.
    #[must_use]
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(status) = self.status {
            cond = cond.add(post::Column::Status.eq(status));
        }
        if let Some(author_id) = &self.author_id {
            cond = cond.add(post::Column::AuthorId.eq(author_id.as_str()));
        }
        if let Some(category) = &self.category {
            cond = cond.add(post::Column::Category.eq(category.as_str()));
        }
        if let Some(tag) = &self.tag {
            cond = cond.add(Expr::cust_with_values(
                "tags @> $1::jsonb",
                [serde_json::json!([tag])],
            ));
        }
        if let Some(search) = &self.search {
            let pattern = format!(
                "%{}%",
                search.to_lowercase().replace('%', "\\%").replace('_', "\\_")
            );
            cond = cond.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(post::Column::Title))).like(&pattern))
                    .add(Expr::expr(Func::lower(Expr::col(post::Column::Content))).like(&pattern))
                    .add(Expr::cust_with_values("LOWER(tags::text) LIKE $1", [pattern])),
            );
        }

        cond
    }
}

/// Listing order, always newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    PublishedAt,
    CreatedAt,
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find a published post by slug.
    pub async fn find_published_by_slug(&self, slug: &str) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Status.eq(PostStatus::Published))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A post with this slug already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model.update(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A post with this slug already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a post. Comments, likes and reactions go with it.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List posts matching a filter.
    pub async fn find_filtered(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<post::Model>> {
        let query = Post::find().filter(filter.condition());
        let query = match sort {
            PostSort::PublishedAt => query
                .order_by_desc(post::Column::PublishedAt)
                .order_by_desc(post::Column::CreatedAt),
            PostSort::CreatedAt => query.order_by_desc(post::Column::CreatedAt),
        };

        query
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts matching a filter.
    pub async fn count_filtered(&self, filter: &PostFilter) -> AppResult<u64> {
        Post::find()
            .filter(filter.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment the view counter atomically (single UPDATE query, no fetch).
    pub async fn increment_views(&self, id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(post::Column::Views, Expr::col(post::Column::Views).add(1))
            .filter(post::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Drafts whose scheduled date has passed.
    pub async fn find_due_scheduled(&self, now: DateTime<Utc>) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::Status.eq(PostStatus::Draft))
            .filter(post::Column::ScheduledDate.is_not_null())
            .filter(post::Column::ScheduledDate.lte(now))
            .order_by_asc(post::Column::ScheduledDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Publish a post only if it is still a draft.
    ///
    /// Returns the number of rows changed, so a concurrent sweep that got
    /// there first yields 0.
    pub async fn publish_if_draft(&self, id: &str, now: DateTime<Utc>) -> AppResult<u64> {
        Post::update_many()
            .col_expr(post::Column::Status, Expr::value(PostStatus::Published))
            // A post returned to draft keeps its first publication time.
            .col_expr(
                post::Column::PublishedAt,
                Func::coalesce([
                    Expr::col(post::Column::PublishedAt).into(),
                    Expr::value(now),
                ])
                .into(),
            )
            .col_expr(post::Column::UpdatedAt, Expr::value(now))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::Status.eq(PostStatus::Draft))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Likes ====================

    /// Check whether a user has liked a post.
    pub async fn is_liked(&self, post_id: &str, user_id: &str) -> AppResult<bool> {
        let like = PostLike::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(like.is_some())
    }

    /// Insert a like. A second like by the same user is a conflict.
    pub async fn add_like(&self, model: post_like::ActiveModel) -> AppResult<()> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Post already liked".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;
        Ok(())
    }

    /// Remove a like, returning the number of rows deleted.
    pub async fn remove_like(&self, post_id: &str, user_id: &str) -> AppResult<u64> {
        PostLike::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes on a post.
    pub async fn count_likes(&self, post_id: &str) -> AppResult<u64> {
        PostLike::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Likers of each post, in like order.
    pub async fn likes_for(&self, post_ids: &[String]) -> AppResult<LikeMap> {
        if post_ids.is_empty() {
            return Ok(LikeMap::new());
        }

        let likes = PostLike::find()
            .filter(post_like::Column::PostId.is_in(post_ids.to_vec()))
            .order_by_asc(post_like::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group_likes(likes.into_iter().map(|l| (l.post_id, l.user_id))))
    }

    // ==================== Reactions ====================

    /// Add a reaction. Returns false if the user already held this emoji.
    pub async fn add_reaction(&self, model: post_reaction::ActiveModel) -> AppResult<bool> {
        let inserted = PostReaction::insert(model)
            .on_conflict(
                OnConflict::columns([
                    post_reaction::Column::PostId,
                    post_reaction::Column::UserId,
                    post_reaction::Column::Emoji,
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
    pub async fn remove_reaction(&self, post_id: &str, user_id: &str, emoji: &str) -> AppResult<bool> {
        let res = PostReaction::delete_many()
            .filter(post_reaction::Column::PostId.eq(post_id))
            .filter(post_reaction::Column::UserId.eq(user_id))
            .filter(post_reaction::Column::Emoji.eq(emoji))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(res.rows_affected > 0)
    }

    /// Reaction maps of several posts.
    pub async fn reactions_for(&self, post_ids: &[String]) -> AppResult<ReactionsByTarget> {
        if post_ids.is_empty() {
            return Ok(ReactionsByTarget::new());
        }

        let reactions = PostReaction::find()
            .filter(post_reaction::Column::PostId.is_in(post_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group_reactions(
            reactions.into_iter().map(|r| (r.post_id, r.user_id, r.emoji)),
        ))
    }

    /// Reaction map of a single post.
    pub async fn reactions_of(&self, post_id: &str) -> AppResult<ReactionMap> {
        let mut all = self.reactions_for(&[post_id.to_string()]).await?;
        Ok(all.remove(post_id).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn create_test_post(id: &str, status: PostStatus) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: "author1".to_string(),
            title: "Hello World".to_string(),
            slug: format!("hello-world-{id}"),
            content: "Some content long enough".to_string(),
            excerpt: None,
            featured_image: None,
            tags: serde_json::json!(["rust"]),
            category: "General".to_string(),
            status,
            scheduled_date: None,
            published_at: None,
            views: 0,
            read_time: 1,
            seo_title: None,
            seo_description: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn exec_result(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        match repo.get_by_id("missing").await {
            Err(AppError::PostNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected PostNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_published_by_slug() {
        let post = create_test_post("p1", PostStatus::Published);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post.clone()]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let found = repo.find_published_by_slug(&post.slug).await.unwrap();
        assert_eq!(found.unwrap().id, "p1");
    }

    #[tokio::test]
    async fn test_find_filtered_and_count() {
        let posts = vec![
            create_test_post("p2", PostStatus::Published),
            create_test_post("p1", PostStatus::Published),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([posts])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let filter = PostFilter {
            tag: Some("rust".to_string()),
            search: Some("Hello".to_string()),
            ..PostFilter::published()
        };

        let page = repo
            .find_filtered(&filter, PostSort::PublishedAt, 0, 10)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(repo.count_filtered(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_publish_if_draft_reports_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_result(1), exec_result(0)])
                .into_connection(),
        );

        let repo = PostRepository::new(Arc::clone(&db));
        let now = Utc::now();
        assert_eq!(repo.publish_if_draft("p1", now).await.unwrap(), 1);
        assert_eq!(repo.publish_if_draft("p1", now).await.unwrap(), 0);
        drop(repo);

        // Only drafts are touched and an earlier publishedAt survives.
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let update = format!("{:?}", log[0]);
        assert!(update.contains("COALESCE("), "{update}");
        assert!(update.contains("published_at"), "{update}");
        assert!(update.contains("WHERE"), "{update}");
    }

    #[tokio::test]
    async fn test_likes_for_groups_by_post() {
        let now = Utc::now();
        let like = |id: &str, post_id: &str, user_id: &str| post_like::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now.into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    like("l1", "p1", "u1"),
                    like("l2", "p1", "u2"),
                    like("l3", "p2", "u1"),
                ]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let map = repo
            .likes_for(&["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();

        assert_eq!(map["p1"], vec!["u1", "u2"]);
        assert_eq!(map["p2"], vec!["u1"]);
    }

    #[tokio::test]
    async fn test_remove_like_reports_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_result(0)])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert_eq!(repo.remove_like("p1", "u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reactions_of_single_post() {
        let now = Utc::now();
        let reaction = |id: &str, user_id: &str, emoji: &str| post_reaction::Model {
            id: id.to_string(),
            post_id: "p1".to_string(),
            user_id: user_id.to_string(),
            emoji: emoji.to_string(),
            created_at: now.into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    reaction("r1", "u1", "🔥"),
                    reaction("r2", "u2", "🔥"),
                    reaction("r3", "u1", "👏"),
                ]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let map = repo.reactions_of("p1").await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["🔥"].len(), 2);
        assert!(map["👏"].contains("u1"));
    }
}
