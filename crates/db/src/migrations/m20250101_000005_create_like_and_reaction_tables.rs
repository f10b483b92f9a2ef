//! Create like and reaction tables for posts and comments.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (parent table, foreign key column) for each likeable entity.
const TARGETS: [(&str, &str); 2] = [("post", "post_id"), ("comment", "comment_id")];

async fn create_like_table(
    manager: &SchemaManager<'_>,
    parent: &str,
    fk: &str,
) -> Result<(), DbErr> {
    let table = format!("{parent}_like");

    manager
        .create_table(
            Table::create()
                .table(Alias::new(&table))
                .if_not_exists()
                .col(
                    ColumnDef::new(Alias::new("id"))
                        .string_len(32)
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Alias::new(fk)).string_len(32).not_null())
                .col(ColumnDef::new(Alias::new("user_id")).string_len(32).not_null())
                .col(
                    ColumnDef::new(Alias::new("created_at"))
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp()),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_{parent}"))
                        .from(Alias::new(&table), Alias::new(fk))
                        .to(Alias::new(parent), Alias::new("id"))
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_user"))
                        .from(Alias::new(&table), Alias::new("user_id"))
                        .to(User::Table, User::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .to_owned(),
        )
        .await?;

    // Unique index: one like per user per target
    manager
        .create_index(
            Index::create()
                .name(format!("idx_{table}_{fk}_user_id"))
                .table(Alias::new(&table))
                .col(Alias::new(fk))
                .col(Alias::new("user_id"))
                .unique()
                .to_owned(),
        )
        .await
}

async fn create_reaction_table(
    manager: &SchemaManager<'_>,
    parent: &str,
    fk: &str,
) -> Result<(), DbErr> {
    let table = format!("{parent}_reaction");

    manager
        .create_table(
            Table::create()
                .table(Alias::new(&table))
                .if_not_exists()
                .col(
                    ColumnDef::new(Alias::new("id"))
                        .string_len(32)
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Alias::new(fk)).string_len(32).not_null())
                .col(ColumnDef::new(Alias::new("user_id")).string_len(32).not_null())
                .col(ColumnDef::new(Alias::new("emoji")).string_len(64).not_null())
                .col(
                    ColumnDef::new(Alias::new("created_at"))
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp()),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_{parent}"))
                        .from(Alias::new(&table), Alias::new(fk))
                        .to(Alias::new(parent), Alias::new("id"))
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_user"))
                        .from(Alias::new(&table), Alias::new("user_id"))
                        .to(User::Table, User::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .to_owned(),
        )
        .await?;

    // Unique index: a user appears at most once per emoji bucket
    manager
        .create_index(
            Index::create()
                .name(format!("idx_{table}_{fk}_user_id_emoji"))
                .table(Alias::new(&table))
                .col(Alias::new(fk))
                .col(Alias::new("user_id"))
                .col(Alias::new("emoji"))
                .unique()
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (parent, fk) in TARGETS {
            create_like_table(manager, parent, fk).await?;
            create_reaction_table(manager, parent, fk).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (parent, _) in TARGETS {
            manager
                .drop_table(
                    Table::drop()
                        .table(Alias::new(format!("{parent}_reaction")))
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(
                    Table::drop()
                        .table(Alias::new(format!("{parent}_like")))
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
