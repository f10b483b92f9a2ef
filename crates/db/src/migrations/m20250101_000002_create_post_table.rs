//! Create post table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Post::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Post::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Post::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Post::Slug).string_len(256).not_null())
                    .col(ColumnDef::new(Post::Content).text().not_null())
                    .col(ColumnDef::new(Post::Excerpt).string_len(300))
                    .col(ColumnDef::new(Post::FeaturedImage).string_len(1024))
                    .col(
                        ColumnDef::new(Post::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Post::Category)
                            .string_len(50)
                            .not_null()
                            .default("General"),
                    )
                    .col(
                        ColumnDef::new(Post::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Post::ScheduledDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Post::PublishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Post::Views).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Post::ReadTime).integer().not_null().default(0))
                    .col(ColumnDef::new(Post::SeoTitle).string_len(60))
                    .col(ColumnDef::new(Post::SeoDescription).string_len(160))
                    .col(
                        ColumnDef::new(Post::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Post::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_author")
                            .from(Post::Table, Post::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: slug
        manager
            .create_index(
                Index::create()
                    .name("idx_post_slug")
                    .table(Post::Table)
                    .col(Post::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (status, published_at) for the public listing
        manager
            .create_index(
                Index::create()
                    .name("idx_post_status_published_at")
                    .table(Post::Table)
                    .col(Post::Status)
                    .col(Post::PublishedAt)
                    .to_owned(),
            )
            .await?;

        // Index: author_id (for author pages and "my posts")
        manager
            .create_index(
                Index::create()
                    .name("idx_post_author_id")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: (status, scheduled_date) for the publish sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_post_status_scheduled_date")
                    .table(Post::Table)
                    .col(Post::Status)
                    .col(Post::ScheduledDate)
                    .to_owned(),
            )
            .await?;

        // Index: category
        manager
            .create_index(
                Index::create()
                    .name("idx_post_category")
                    .table(Post::Table)
                    .col(Post::Category)
                    .to_owned(),
            )
            .await?;

        // GIN index for tag containment queries
        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX IF NOT EXISTS idx_post_tags ON post USING GIN (tags)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
    AuthorId,
    Title,
    Slug,
    Content,
    Excerpt,
    FeaturedImage,
    Tags,
    Category,
    Status,
    ScheduledDate,
    PublishedAt,
    Views,
    ReadTime,
    SeoTitle,
    SeoDescription,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
