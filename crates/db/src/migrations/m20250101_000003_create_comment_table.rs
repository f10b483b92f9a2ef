//! Create comment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comment::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::ParentId).string_len(32))
                    .col(ColumnDef::new(Comment::Content).text().not_null())
                    .col(
                        ColumnDef::new(Comment::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Comment::IsEdited).boolean().not_null().default(false))
                    .col(ColumnDef::new(Comment::EditedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Comment::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_post")
                            .from(Comment::Table, Comment::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_author")
                            .from(Comment::Table, Comment::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_parent")
                            .from(Comment::Table, Comment::ParentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (post_id, status, created_at) for thread listings
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_post_status_created_at")
                    .table(Comment::Table)
                    .col(Comment::PostId)
                    .col(Comment::Status)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: parent_id (children of a comment)
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_parent_id")
                    .table(Comment::Table)
                    .col(Comment::ParentId)
                    .to_owned(),
            )
            .await?;

        // Index: author_id
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_author_id")
                    .table(Comment::Table)
                    .col(Comment::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    PostId,
    AuthorId,
    ParentId,
    Content,
    Status,
    IsEdited,
    EditedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
