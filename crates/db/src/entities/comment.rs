//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation state of a comment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// A comment on a post. Replies point at their parent through `parent_id`,
/// which forms an adjacency list rooted at top-level comments.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub post_id: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    /// `None` for top-level comments
    #[sea_orm(indexed, nullable)]
    pub parent_id: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub status: CommentStatus,

    #[sea_orm(default_value = false)]
    pub is_edited: bool,

    #[sea_orm(nullable)]
    pub edited_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether anonymous readers may see this comment.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.status == CommentStatus::Approved
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,

    #[sea_orm(has_many = "super::comment_like::Entity")]
    Likes,

    #[sea_orm(has_many = "super::comment_reaction::Entity")]
    Reactions,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::comment_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
