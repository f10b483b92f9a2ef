//! Report repository.

use std::sync::Arc;

use crate::entities::{Report, report, report::ReportStatus};
use opendraft_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn queue(status: Option<ReportStatus>) -> Select<Report> {
        match status {
            Some(status) => Report::find().filter(report::Column::Status.eq(status)),
            None => Report::find(),
        }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    /// Create a new report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a report.
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Report::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reports in the review queue, newest first.
    pub async fn find_paginated(
        &self,
        status: Option<ReportStatus>,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<report::Model>> {
        Self::queue(status)
            .order_by_desc(report::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count reports, optionally by status.
    pub async fn count(&self, status: Option<ReportStatus>) -> AppResult<u64> {
        Self::queue(status)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::report::ReportType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report::Model>::new()])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        match repo.get_by_id("r1").await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Report not found"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_paginated_by_status() {
        let model = report::Model {
            id: "r1".to_string(),
            reporter_id: "user1".to_string(),
            report_type: ReportType::Post,
            target_id: "post1".to_string(),
            reason: "Spam".to_string(),
            status: ReportStatus::Pending,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[model]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let reports = repo
            .find_paginated(Some(ReportStatus::Pending), 0, 20)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report_type, ReportType::Post);
    }
}
