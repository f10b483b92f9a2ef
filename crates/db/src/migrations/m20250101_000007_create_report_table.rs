//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Report::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Report::ReporterId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::ReportType).string_len(16).not_null())
                    .col(ColumnDef::new(Report::TargetId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::Reason).text().not_null())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Report::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_reporter")
                            .from(Report::Table, Report::ReporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (status, created_at) for the review queue
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status_created_at")
                    .table(Report::Table)
                    .col(Report::Status)
                    .col(Report::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (report_type, target_id) for "reports about X"
        manager
            .create_index(
                Index::create()
                    .name("idx_report_type_target_id")
                    .table(Report::Table)
                    .col(Report::ReportType)
                    .col(Report::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    ReporterId,
    ReportType,
    TargetId,
    Reason,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
