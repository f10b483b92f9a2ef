//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "reader")]
    #[default]
    Reader,
    #[sea_orm(string_value = "author")]
    Author,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name
    pub name: String,

    /// Login e-mail, stored lowercase
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Bearer token; cleared on logout
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    #[sea_orm(nullable)]
    pub avatar: Option<String>,

    pub role: UserRole,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
