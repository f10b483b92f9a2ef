//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Publication state of a post.
///
/// Posts only move forward: draft, then published, then archived. Only
/// published posts are visible to the public.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[sea_orm(string_value = "draft")]
    #[default]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning author; never changes after creation
    #[sea_orm(indexed)]
    pub author_id: String,

    pub title: String,

    /// URL identifier, unique across all posts
    #[sea_orm(unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(nullable)]
    pub excerpt: Option<String>,

    #[sea_orm(nullable)]
    pub featured_image: Option<String>,

    /// Tag strings as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    pub category: String,

    pub status: PostStatus,

    /// When the publish sweep should promote this draft
    #[sea_orm(nullable)]
    pub scheduled_date: Option<DateTimeWithTimeZone>,

    /// Set the first time the post becomes published and never changed
    #[sea_orm(nullable)]
    pub published_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = 0)]
    pub views: i64,

    /// Minutes, `ceil(words / 200)`
    pub read_time: i32,

    #[sea_orm(nullable)]
    pub seo_title: Option<String>,

    #[sea_orm(nullable)]
    pub seo_description: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Tags as plain strings. Non-string entries are skipped.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether anonymous readers may see this post.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.status == PostStatus::Published
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::post_like::Entity")]
    Likes,

    #[sea_orm(has_many = "super::post_reaction::Entity")]
    Reactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::post_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::post_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
