//! Database layer for OpenDraft.
//!
//! Entities, schema migrations and repositories over sea-orm. Set-valued
//! fields (likes, reactions, follow edges) are join tables with unique
//! indexes, so membership is deduplicated by the database.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use opendraft_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("Database schema is up to date");
    Ok(())
}

/// Whether a database error is a unique-constraint violation.
///
/// Repositories use this to turn races on unique indexes (slug, email,
/// like pairs) into conflicts instead of server errors.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    )
}
