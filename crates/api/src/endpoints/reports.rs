//! Report queue endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, put},
};
use opendraft_common::AppResult;
use opendraft_core::{CreateReportInput, PageRequest};
use opendraft_db::entities::report::{self, ReportStatus, ReportType};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AppJson, AuthUser, ValidQuery},
    middleware::AppState,
    response::ApiResponse,
};

/// Report response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub target_id: String,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<report::Model> for ReportResponse {
    fn from(r: report::Model) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            report_type: r.report_type,
            target_id: r.target_id,
            reason: r.reason,
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReportsQuery {
    #[validate(range(min = 1, max = 100_000, message = "Page must be between 1 and 100000"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportRequest {
    pub status: String,
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateReportInput>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state.report_service.create(&user.id, input).await?;
    Ok(ApiResponse::created(report.into()))
}

/// The review queue (admin).
async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ReportsQuery>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let page = state
        .report_service
        .list(
            &auth.actor(),
            query.status.as_deref(),
            PageRequest::new(query.page, query.limit),
        )
        .await?;
    Ok(ApiResponse::paginated(page, ReportResponse::from))
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateReportRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .report_service
        .update_status(&auth.actor(), &id, &req.status)
        .await?;
    Ok(ApiResponse::ok(report.into()))
}

async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.report_service.delete(&auth.actor(), &id).await?;
    Ok(ApiResponse::message("Report deleted successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(update).delete(delete))
}
