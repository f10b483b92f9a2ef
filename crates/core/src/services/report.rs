//! Report service: the admin moderation queue.
//!
//! Reports are bookkeeping only. Resolving one never touches the reported
//! post, comment or user.

use chrono::Utc;
use opendraft_common::{AppError, AppResult, IdGenerator};
use opendraft_db::{
    entities::report::{self, ReportStatus, ReportType},
    repositories::ReportRepository,
};
use sea_orm::{ActiveEnum, Set};
use serde::Deserialize;
use validator::Validate;

use crate::pagination::{Page, PageRequest};
use crate::policy::{Actor, Permission, authorize};

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    id_gen: IdGenerator,
}

/// Input for filing a report.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    #[serde(rename = "type")]
    pub report_type: String,

    #[validate(length(min = 1, message = "Target ID is required"))]
    pub target_id: String,

    #[validate(length(min = 1, max = 1000, message = "Reason must be between 1 and 1000 characters"))]
    pub reason: String,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(report_repo: ReportRepository) -> Self {
        Self {
            report_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report. Any authenticated user may report anything.
    pub async fn create(&self, reporter_id: &str, mut input: CreateReportInput) -> AppResult<report::Model> {
        input.reason = input.reason.trim().to_string();
        input.validate()?;

        let report_type = ReportType::try_from_value(&input.report_type)
            .map_err(|_| AppError::BadRequest("Invalid report type".to_string()))?;

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter_id.to_string()),
            report_type: Set(report_type),
            target_id: Set(input.target_id),
            reason: Set(input.reason),
            status: Set(ReportStatus::Pending),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let report = self.report_repo.create(model).await?;
        tracing::info!(
            report_id = %report.id,
            report_type = ?report.report_type,
            target_id = %report.target_id,
            "Report filed"
        );
        Ok(report)
    }

    /// The review queue, newest first.
    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<report::Model>> {
        authorize(actor, Permission::ManageReports, None)?;
        let status = status.map(parse_status).transpose()?;

        let reports = self
            .report_repo
            .find_paginated(status, page.offset(), page.limit)
            .await?;
        let total = self.report_repo.count(status).await?;
        Ok(Page::new(reports, total, page))
    }

    /// Move a report through review.
    pub async fn update_status(&self, actor: &Actor, id: &str, status: &str) -> AppResult<report::Model> {
        authorize(actor, Permission::ManageReports, None)?;
        let status = parse_status(status)?;

        let report = self.report_repo.get_by_id(id).await?;
        let mut active: report::ActiveModel = report.into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));

        let report = self.report_repo.update(active).await?;
        tracing::info!(report_id = %report.id, status = ?status, actor_id = %actor.id, "Report updated");
        Ok(report)
    }

    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        authorize(actor, Permission::ManageReports, None)?;

        let report = self.report_repo.get_by_id(id).await?;
        self.report_repo.delete(&report.id).await?;
        tracing::info!(report_id = %report.id, actor_id = %actor.id, "Report deleted");
        Ok(())
    }
}

fn parse_status(status: &str) -> AppResult<ReportStatus> {
    ReportStatus::try_from_value(&status.to_string()).map_err(|_| {
        AppError::Validation(
            "Invalid status. Must be pending, reviewed, resolved, or rejected".to_string(),
        )
    })
}
