//! Post service.
//!
//! Owns the publishing lifecycle: slug and read time derivation, the
//! draft/published/archived state machine with a write-once `published_at`,
//! scheduled publishing, likes and emoji reactions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use opendraft_common::{AppError, AppResult, IdGenerator, derive_slug, read_time};
use opendraft_db::{
    entities::{
        comment::CommentStatus,
        notification::NotificationType,
        post::{self, PostStatus},
        post_like, post_reaction, user,
    },
    repositories::{
        CommentFilter, CommentRepository, PostFilter, PostRepository, PostSort, ReactionMap,
        UserRepository,
    },
};
use sea_orm::{ActiveEnum, Iterable, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::pagination::{Page, PageRequest};
use crate::policy::{Actor, Permission, authorize};
use crate::services::notification::NotificationService;
use crate::services::{double_option, validate_emoji};

const DEFAULT_CATEGORY: &str = "General";

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    comment_repo: CommentRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

/// A post with its author, likers and reactions resolved.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: post::Model,
    pub author: Option<user::Model>,
    pub likes: Vec<String>,
    pub reactions: ReactionMap,
    /// Only known when the request carried a user.
    pub is_liked: Option<bool>,
}

/// Input for creating a post.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Content must be at least 10 characters"))]
    pub content: String,

    #[validate(length(max = 300, message = "Excerpt cannot be more than 300 characters"))]
    pub excerpt: Option<String>,

    #[validate(url(message = "Featured image must be a valid URL"))]
    pub featured_image: Option<String>,

    pub tags: Option<Vec<String>>,

    #[validate(length(max = 50, message = "Category cannot be more than 50 characters"))]
    pub category: Option<String>,

    pub status: Option<String>,

    pub scheduled_date: Option<DateTime<Utc>>,

    #[validate(length(max = 60, message = "SEO title cannot be more than 60 characters"))]
    pub seo_title: Option<String>,

    #[validate(length(max = 160, message = "SEO description cannot be more than 160 characters"))]
    pub seo_description: Option<String>,
}

/// Partial update of a post. `scheduledDate: null` clears the schedule.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 10, message = "Content must be at least 10 characters"))]
    pub content: Option<String>,

    #[validate(length(max = 300, message = "Excerpt cannot be more than 300 characters"))]
    pub excerpt: Option<String>,

    #[validate(url(message = "Featured image must be a valid URL"))]
    pub featured_image: Option<String>,

    pub tags: Option<Vec<String>>,

    #[validate(length(max = 50, message = "Category cannot be more than 50 characters"))]
    pub category: Option<String>,

    pub status: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_date: Option<Option<DateTime<Utc>>>,

    #[validate(length(max = 60, message = "SEO title cannot be more than 60 characters"))]
    pub seo_title: Option<String>,

    #[validate(length(max = 160, message = "SEO description cannot be more than 160 characters"))]
    pub seo_description: Option<String>,
}

/// Filters of the public post listing.
#[derive(Debug, Clone, Default)]
pub struct ListPostsQuery {
    pub page: PageRequest,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
}

/// Engagement figures of a single post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAnalytics {
    pub post_id: String,
    pub views: i64,
    pub like_count: u64,
    /// Number of users per emoji.
    pub reactions: BTreeMap<String, usize>,
    /// Number of comments per moderation status.
    pub comments: BTreeMap<String, u64>,
    pub read_time: i32,
}

/// Outcome of one scheduled-publishing sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub published: u64,
    /// Claimed by a concurrent sweep or edited in between.
    pub skipped: u64,
    pub failed: u64,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        comment_repo: CommentRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            comment_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a post owned by `author_id`.
    pub async fn create(&self, author_id: &str, mut input: CreatePostInput) -> AppResult<PostView> {
        input.title = input.title.trim().to_string();
        input.content = input.content.trim().to_string();
        input.validate()?;

        let status = match input.status.as_deref() {
            Some(s) => parse_status(s)?,
            None => PostStatus::Draft,
        };
        let now = Utc::now();

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            slug: Set(derive_slug(&input.title, now)),
            read_time: Set(read_time(&input.content)),
            title: Set(input.title),
            content: Set(input.content),
            excerpt: Set(input.excerpt),
            featured_image: Set(input.featured_image),
            tags: Set(json!(normalize_tags(input.tags.unwrap_or_default()))),
            category: Set(normalize_category(input.category)),
            status: Set(status),
            scheduled_date: Set(input.scheduled_date.map(Into::into)),
            published_at: Set((status == PostStatus::Published).then(|| now.into())),
            views: Set(0),
            seo_title: Set(input.seo_title),
            seo_description: Set(input.seo_description),
            created_at: Set(now.into()),
            ..Default::default()
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, status = ?post.status, "Post created");

        let author = self.user_repo.find_by_id(author_id).await?;
        Ok(PostView {
            post,
            author,
            likes: Vec::new(),
            reactions: ReactionMap::new(),
            is_liked: None,
        })
    }

    /// Apply a partial update (owner or admin).
    pub async fn update(&self, actor: &Actor, id: &str, mut input: UpdatePostInput) -> AppResult<PostView> {
        input.title = input.title.map(|t| t.trim().to_string());
        input.content = input.content.map(|c| c.trim().to_string());
        input.validate()?;

        let post = self.post_repo.get_by_id(id).await?;
        authorize(actor, Permission::EditPost, Some(&post.author_id))?;

        let new_status = input.status.as_deref().map(parse_status).transpose()?;
        let now = Utc::now();
        let published_at = post.published_at;
        let mut active: post::ActiveModel = post.clone().into();

        if let Some(title) = input.title.filter(|t| *t != post.title) {
            active.slug = Set(derive_slug(&title, now));
            active.title = Set(title);
        }
        if let Some(content) = input.content.filter(|c| *c != post.content) {
            active.read_time = Set(read_time(&content));
            active.content = Set(content);
        }
        if let Some(excerpt) = input.excerpt {
            active.excerpt = Set(Some(excerpt));
        }
        if let Some(image) = input.featured_image {
            active.featured_image = Set(Some(image));
        }
        if let Some(tags) = input.tags {
            active.tags = Set(json!(normalize_tags(tags)));
        }
        if input.category.is_some() {
            active.category = Set(normalize_category(input.category));
        }
        if let Some(scheduled) = input.scheduled_date {
            active.scheduled_date = Set(scheduled.map(Into::into));
        }
        if let Some(seo_title) = input.seo_title {
            active.seo_title = Set(Some(seo_title));
        }
        if let Some(seo_description) = input.seo_description {
            active.seo_description = Set(Some(seo_description));
        }
        if let Some(status) = new_status {
            active.status = Set(status);
            if status == PostStatus::Published && published_at.is_none() {
                active.published_at = Set(Some(now.into()));
            }
        }
        active.updated_at = Set(Some(now.into()));

        let post = self.post_repo.update(active).await?;
        tracing::info!(post_id = %post.id, actor_id = %actor.id, "Post updated");

        let mut views = self.assemble(vec![post], Some(&actor.id)).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("Updated post vanished".to_string()))
    }

    /// Delete a post (owner or admin). Comments, likes and reactions cascade.
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;
        authorize(actor, Permission::DeletePost, Some(&post.author_id))?;

        self.post_repo.delete(&post.id).await?;
        tracing::info!(post_id = %post.id, actor_id = %actor.id, "Post deleted");
        Ok(())
    }

    /// Fetch a published post by slug and count the view.
    pub async fn get_by_slug(&self, slug: &str, viewer_id: Option<&str>) -> AppResult<PostView> {
        let mut post = self
            .post_repo
            .find_published_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::PostNotFound(slug.to_string()))?;

        self.post_repo.increment_views(&post.id).await?;
        post.views += 1;

        let mut views = self.assemble(vec![post], viewer_id).await?;
        views
            .pop()
            .ok_or_else(|| AppError::PostNotFound(slug.to_string()))
    }

    /// Public listing: published posts, newest publication first.
    pub async fn list(&self, query: ListPostsQuery, viewer_id: Option<&str>) -> AppResult<Page<PostView>> {
        let filter = PostFilter {
            author_id: query.author,
            category: query.category,
            tag: query.tag,
            search: query.search.filter(|s| !s.trim().is_empty()),
            ..PostFilter::published()
        };

        self.page(&filter, PostSort::PublishedAt, query.page, viewer_id)
            .await
    }

    /// The caller's own posts in every status.
    pub async fn my_posts(&self, author_id: &str, page: PageRequest) -> AppResult<Page<PostView>> {
        let filter = PostFilter {
            author_id: Some(author_id.to_string()),
            ..Default::default()
        };
        self.page(&filter, PostSort::CreatedAt, page, Some(author_id))
            .await
    }

    /// Published posts of one author, with the author profile.
    pub async fn by_author(
        &self,
        author_id: &str,
        page: PageRequest,
        viewer_id: Option<&str>,
    ) -> AppResult<(user::Model, Page<PostView>)> {
        let author = self
            .user_repo
            .find_by_id(author_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))?;

        let filter = PostFilter {
            author_id: Some(author.id.clone()),
            ..PostFilter::published()
        };
        let posts = self
            .page(&filter, PostSort::PublishedAt, page, viewer_id)
            .await?;

        Ok((author, posts))
    }

    /// Every post in any status (admin).
    pub async fn all_posts(
        &self,
        actor: &Actor,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<PostView>> {
        authorize(actor, Permission::ViewAllPosts, None)?;

        let filter = PostFilter {
            status: status.map(parse_status).transpose()?,
            ..Default::default()
        };
        self.page(&filter, PostSort::CreatedAt, page, Some(&actor.id))
            .await
    }

    /// Like a post. Returns the new like count.
    pub async fn like(&self, user_id: &str, post_id: &str) -> AppResult<u64> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if self.post_repo.is_liked(&post.id, user_id).await? {
            return Err(AppError::Conflict("Post already liked".to_string()));
        }

        let like = post_like::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            user_id: Set(user_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        self.post_repo.add_like(like).await?;

        self.notification_service
            .notify(
                &post.author_id,
                user_id,
                NotificationType::Like,
                json!({ "postId": post.id, "slug": post.slug }),
            )
            .await;

        self.post_repo.count_likes(&post.id).await
    }

    /// Remove a like. Returns the new like count.
    pub async fn unlike(&self, user_id: &str, post_id: &str) -> AppResult<u64> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if self.post_repo.remove_like(&post.id, user_id).await? == 0 {
            return Err(AppError::Conflict("Post not liked".to_string()));
        }

        self.post_repo.count_likes(&post.id).await
    }

    /// Add the caller to an emoji bucket. Idempotent.
    pub async fn react(&self, user_id: &str, post_id: &str, emoji: &str) -> AppResult<ReactionMap> {
        let emoji = validate_emoji(emoji)?;
        let post = self.post_repo.get_by_id(post_id).await?;

        let reaction = post_reaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            user_id: Set(user_id.to_string()),
            emoji: Set(emoji.to_string()),
            created_at: Set(Utc::now().into()),
        };

        if self.post_repo.add_reaction(reaction).await? {
            self.notification_service
                .notify(
                    &post.author_id,
                    user_id,
                    NotificationType::Reaction,
                    json!({ "postId": post.id, "slug": post.slug, "emoji": emoji }),
                )
                .await;
        }

        self.post_repo.reactions_of(&post.id).await
    }

    /// Remove the caller from an emoji bucket. Idempotent.
    pub async fn unreact(&self, user_id: &str, post_id: &str, emoji: &str) -> AppResult<ReactionMap> {
        let emoji = validate_emoji(emoji)?;
        let post = self.post_repo.get_by_id(post_id).await?;

        self.post_repo
            .remove_reaction(&post.id, user_id, emoji)
            .await?;

        self.post_repo.reactions_of(&post.id).await
    }

    /// Engagement figures (owner or admin).
    pub async fn analytics(&self, actor: &Actor, post_id: &str) -> AppResult<PostAnalytics> {
        let post = self.post_repo.get_by_id(post_id).await?;
        authorize(actor, Permission::ViewPostAnalytics, Some(&post.author_id))?;

        let like_count = self.post_repo.count_likes(&post.id).await?;
        let reactions = self
            .post_repo
            .reactions_of(&post.id)
            .await?
            .into_iter()
            .map(|(emoji, users)| (emoji, users.len()))
            .collect();

        let mut comments = BTreeMap::new();
        for status in CommentStatus::iter() {
            let filter = CommentFilter {
                post_id: Some(post.id.clone()),
                status: Some(status),
            };
            let count = self.comment_repo.count_filtered(&filter).await?;
            comments.insert(status.to_value(), count);
        }

        Ok(PostAnalytics {
            post_id: post.id,
            views: post.views,
            like_count,
            reactions,
            comments,
            read_time: post.read_time,
        })
    }

    /// Publish every draft whose scheduled date is at or before `now`.
    ///
    /// Each post is claimed with a conditional update, so overlapping
    /// sweeps publish it once. A failing post is logged and skipped.
    pub async fn publish_due_posts(&self, now: DateTime<Utc>) -> AppResult<PublishReport> {
        let due = self.post_repo.find_due_scheduled(now).await?;
        let mut report = PublishReport::default();

        for post in due {
            match self.post_repo.publish_if_draft(&post.id, now).await {
                Ok(0) => report.skipped += 1,
                Ok(_) => {
                    report.published += 1;
                    tracing::info!(post_id = %post.id, slug = %post.slug, "Scheduled post published");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, post_id = %post.id, "Failed to publish scheduled post");
                }
            }
        }

        Ok(report)
    }

    async fn page(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        page: PageRequest,
        viewer_id: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        let posts = self
            .post_repo
            .find_filtered(filter, sort, page.offset(), page.limit)
            .await?;
        let total = self.post_repo.count_filtered(filter).await?;
        let items = self.assemble(posts, viewer_id).await?;

        Ok(Page::new(items, total, page))
    }

    /// Resolve authors, likes and reactions for a batch of posts.
    async fn assemble(&self, posts: Vec<post::Model>, viewer_id: Option<&str>) -> AppResult<Vec<PostView>> {
        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let mut likes = self.post_repo.likes_for(&ids).await?;
        let mut reactions = self.post_repo.reactions_for(&ids).await?;

        Ok(posts
            .into_iter()
            .map(|post| {
                let likes = likes.remove(&post.id).unwrap_or_default();
                let is_liked = viewer_id.map(|v| likes.iter().any(|id| id == v));
                PostView {
                    author: authors.get(&post.author_id).cloned(),
                    reactions: reactions.remove(&post.id).unwrap_or_default(),
                    likes,
                    is_liked,
                    post,
                }
            })
            .collect())
    }
}

fn parse_status(status: &str) -> AppResult<PostStatus> {
    PostStatus::try_from_value(&status.to_string()).map_err(|_| {
        AppError::Validation("Status must be draft, published, or archived".to_string())
    })
}

/// Trim, drop empties and de-duplicate while keeping first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

fn normalize_category(category: Option<String>) -> String {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
