//! JSON API for the timesheet approval workflow.
//!
//! Endpoints:
//! - `PATCH /api/timesheets`: apply one approve/reject decision
//! - `POST  /api/timesheets/bulk`: apply one decision to a batch of timesheets
//! - `GET   /api/timesheets/{id}`: fetch a timesheet with its entries
//! - `GET   /api/timesheets`: list timesheets, filtered by status/account
//!
//! Request bodies deserialize permissively: unknown fields are ignored and
//! every field is optional at the serde layer, so the handlers own the
//! validation order and the exact error wording. All error responses are
//! `{ "error": "..." }`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use timeclerk_core::approvals::DecisionAction;
use timeclerk_core::domain::account::AccountId;
use timeclerk_core::domain::timesheet::{
    Timesheet, TimesheetEntry, TimesheetId, TimesheetStatus,
};
use timeclerk_core::errors::WorkflowError;
use timeclerk_db::repositories::TimesheetFilter;

use crate::workflow::{ApprovalService, BulkDecisionCommand, BulkOutcome, DecisionCommand};

#[derive(Clone)]
pub struct ApiState {
    service: Arc<ApprovalService>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionRequest {
    pub timesheet_id: Option<String>,
    pub action: Option<String>,
    pub manager_id: Option<String>,
    pub approval_comments: Option<String>,
    pub rejection_comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BulkDecisionRequest {
    pub timesheet_ids: Option<Vec<String>>,
    pub action: Option<String>,
    pub manager_id: Option<String>,
    pub approval_comments: Option<String>,
    pub rejection_comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<String>,
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetResponse {
    pub id: String,
    pub account_id: String,
    pub week_start: NaiveDate,
    pub status: TimesheetStatus,
    pub submitted_at: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub approval_comments: Option<String>,
    pub rejection_comments: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Timesheet> for TimesheetResponse {
    fn from(timesheet: Timesheet) -> Self {
        Self {
            id: timesheet.id.0,
            account_id: timesheet.account_id.0,
            week_start: timesheet.week_start,
            status: timesheet.status,
            submitted_at: timesheet.submitted_at.map(|at| at.to_rfc3339()),
            approved_by: timesheet.approved_by.map(|id| id.0),
            approved_at: timesheet.approved_at.map(|at| at.to_rfc3339()),
            approval_comments: timesheet.approval_comments,
            rejection_comments: timesheet.rejection_comments,
            created_at: timesheet.created_at.to_rfc3339(),
            updated_at: timesheet.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: String,
    pub project_id: String,
    pub work_date: NaiveDate,
    pub hours: String,
    pub billable: bool,
}

impl From<TimesheetEntry> for EntryResponse {
    fn from(entry: TimesheetEntry) -> Self {
        Self {
            id: entry.id,
            project_id: entry.project_id.0,
            work_date: entry.work_date,
            hours: entry.hours.to_string(),
            billable: entry.billable,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimesheetDetailResponse {
    #[serde(flatten)]
    pub timesheet: TimesheetResponse,
    pub entries: Vec<EntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct BulkDecisionResponse {
    pub message: String,
    pub results: BulkResults,
}

#[derive(Debug, Serialize)]
pub struct BulkResults {
    pub succeeded: Vec<BulkSucceededItem>,
    pub failed: Vec<BulkFailedItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSucceededItem {
    pub timesheet_id: String,
    pub status: TimesheetStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailedItem {
    pub timesheet_id: String,
    pub reason: String,
}

impl BulkDecisionResponse {
    fn from_outcome(action: DecisionAction, outcome: BulkOutcome) -> Self {
        Self {
            message: outcome.summary(action),
            results: BulkResults {
                succeeded: outcome
                    .succeeded
                    .into_iter()
                    .map(|item| BulkSucceededItem {
                        timesheet_id: item.timesheet_id.0,
                        status: item.status,
                    })
                    .collect(),
                failed: outcome
                    .failed
                    .into_iter()
                    .map(|item| BulkFailedItem {
                        timesheet_id: item.timesheet_id.0,
                        reason: item.reason,
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(service: Arc<ApprovalService>) -> Router {
    Router::new()
        .route("/api/timesheets", patch(decide_timesheet).get(list_timesheets))
        .route("/api/timesheets/bulk", post(bulk_decide_timesheets))
        .route("/api/timesheets/{id}", get(get_timesheet))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { service })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Apply one approve/reject decision.
///
/// Validation order is part of the contract: `timesheetId`, then `action`,
/// then `managerId` (its absence is a 401, not a 400), then the
/// reject-comments requirement.
async fn decide_timesheet(
    State(state): State<ApiState>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<TimesheetResponse>, (StatusCode, Json<ApiError>)> {
    let timesheet_id = body
        .timesheet_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| bad_request("timesheetId is required"))?;

    let action = parse_action(body.action.as_deref())?;

    let manager_id = body
        .manager_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthorized("managerId is required"))?;

    if action == DecisionAction::Reject && !has_content(body.rejection_comments.as_deref()) {
        return Err(bad_request("rejectionComments is required when rejecting"));
    }

    let updated = state
        .service
        .decide(DecisionCommand {
            timesheet_id: TimesheetId(timesheet_id.to_string()),
            action,
            manager_id: AccountId(manager_id.to_string()),
            approval_comments: body.approval_comments,
            rejection_comments: body.rejection_comments,
        })
        .await
        .map_err(workflow_error)?;

    Ok(Json(TimesheetResponse::from(updated)))
}

/// Apply one decision to every timesheet in the batch.
///
/// Comments are hard-required for both actions here, unlike the single
/// endpoint where approval comments stay optional. The response is always
/// 200 once the batch is accepted; per-item failures live in `results`.
async fn bulk_decide_timesheets(
    State(state): State<ApiState>,
    Json(body): Json<BulkDecisionRequest>,
) -> Result<Json<BulkDecisionResponse>, (StatusCode, Json<ApiError>)> {
    let timesheet_ids = body.timesheet_ids.unwrap_or_default();
    if timesheet_ids.is_empty() {
        return Err(bad_request("timesheetIds must be a non-empty array"));
    }

    let action = parse_action(body.action.as_deref())?;

    let manager_id = body
        .manager_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthorized("managerId is required"))?;

    let comments = match action {
        DecisionAction::Approve => body
            .approval_comments
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| bad_request("approvalComments is required for bulk approve"))?,
        DecisionAction::Reject => body
            .rejection_comments
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| bad_request("rejectionComments is required for bulk reject"))?,
    };

    let outcome = state
        .service
        .decide_bulk(BulkDecisionCommand {
            timesheet_ids: timesheet_ids.into_iter().map(TimesheetId).collect(),
            action,
            manager_id: AccountId(manager_id.to_string()),
            comments,
        })
        .await
        .map_err(workflow_error)?;

    Ok(Json(BulkDecisionResponse::from_outcome(action, outcome)))
}

async fn get_timesheet(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<TimesheetDetailResponse>, (StatusCode, Json<ApiError>)> {
    let (timesheet, entries) =
        state.service.get_timesheet(&TimesheetId(id)).await.map_err(workflow_error)?;

    Ok(Json(TimesheetDetailResponse {
        timesheet: TimesheetResponse::from(timesheet),
        entries: entries.into_iter().map(EntryResponse::from).collect(),
    }))
}

async fn list_timesheets(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TimesheetResponse>>, (StatusCode, Json<ApiError>)> {
    let mut filter = TimesheetFilter::default();

    if let Some(raw) = query.status.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        let status = TimesheetStatus::parse(raw).ok_or_else(|| {
            bad_request("status must be draft, submitted, approved, or rejected")
        })?;
        filter.status = Some(status);
    }

    if let Some(account) =
        query.account.as_deref().map(str::trim).filter(|value| !value.is_empty())
    {
        filter.account_id = Some(AccountId(account.to_string()));
    }

    let timesheets = state.service.list_timesheets(&filter).await.map_err(workflow_error)?;
    Ok(Json(timesheets.into_iter().map(TimesheetResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_action(raw: Option<&str>) -> Result<DecisionAction, (StatusCode, Json<ApiError>)> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| bad_request("action is required"))?;
    DecisionAction::parse(raw).ok_or_else(|| bad_request("action must be approve or reject"))
}

fn has_content(value: Option<&str>) -> bool {
    value.map(str::trim).is_some_and(|value| !value.is_empty())
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message.to_string() }))
}

fn unauthorized(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::UNAUTHORIZED, Json(ApiError { error: message.to_string() }))
}

fn workflow_error(error: WorkflowError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Authentication(_) => StatusCode::UNAUTHORIZED,
        WorkflowError::Authorization(_) => StatusCode::FORBIDDEN,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidState { .. } => StatusCode::CONFLICT,
        WorkflowError::Repository(detail) => {
            error!(error = %detail, "timesheet api database error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError { error: "an internal error occurred".to_string() }),
            );
        }
    };
    (status, Json(ApiError { error: error.to_string() }))
}
