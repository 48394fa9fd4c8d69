// src/api.rs
//! JSON HTTP adapter over the resolver.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::directory::BusinessUnit;
use crate::edit_window::{first_reporting_week, EditDecision, EditWindowPolicy, WeekOption};
use crate::error::{DateError, LedgerError, ReportError};
use crate::issue_ledger::IssueStatus;
use crate::period_key::PeriodKey;
use crate::priority::{self, PriorityIssue, SortKey, SortOrder, WeekOverview};
use crate::report::{Report, ReportDraft};
use crate::resolver::ReportResolver;
use crate::week_math::CalendarDate;

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("{0}")]
    NotFound(String),
}

impl From<DateError> for AppError {
    fn from(e: DateError) -> Self {
        AppError::Report(e.into())
    }
}

impl From<crate::error::ParseError> for AppError {
    fn from(e: crate::error::ParseError) -> Self {
        AppError::Report(e.into())
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let report = match self {
            AppError::NotFound(message) => return (StatusCode::NOT_FOUND, message.clone()),
            AppError::Report(report) => report,
        };
        match report {
            ReportError::Date(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ReportError::Parse(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ReportError::Resolution(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ReportError::MissingSubmitter => {
                (StatusCode::UNPROCESSABLE_ENTITY, report.to_string())
            }
            ReportError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load/save the report, try again.".to_string(),
            ),
            ReportError::WeekLocked { period, decision } => {
                let why = match decision {
                    EditDecision::LockedPast => "is in the past",
                    EditDecision::LockedFuture => "is not open yet",
                    EditDecision::Editable => "is editable",
                };
                (
                    StatusCode::FORBIDDEN,
                    format!("Week {period} {why} and cannot be edited."),
                )
            }
            ReportError::ReportNotFound { .. } => (StatusCode::NOT_FOUND, report.to_string()),
            ReportError::Ledger(LedgerError::IssueNotFound { .. }) => {
                (StatusCode::NOT_FOUND, report.to_string())
            }
            ReportError::Ledger(LedgerError::BlankDescription) => {
                (StatusCode::UNPROCESSABLE_ENTITY, report.to_string())
            }
            ReportError::Ledger(_) => (StatusCode::CONFLICT, report.to_string()),
        }
    }
}

// Map AppError to Axum's IntoResponse
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// --- Shared Application State ---

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ReportResolver>,
}

impl AppState {
    pub fn new(resolver: ReportResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/weeks", get(list_weeks))
        .route("/weeks/current", get(current_week))
        .route("/weeks/{key}", get(week_info))
        .route("/directory", get(directory))
        .route("/reports", get(list_reports).post(submit_report))
        .route("/reports/{week}/{business_unit}/{division}", get(get_report))
        .route(
            "/reports/{week}/{business_unit}/{division}/issues/{issue_id}/status",
            put(update_issue_status),
        )
        .route("/issues/priority", get(priority_issues))
        .route("/overview", get(overview));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Week lookups ---

/// Everything the presentation layer needs about one custom week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekInfo {
    pub key: PeriodKey,
    pub label: String,
    pub year: i32,
    pub week: u32,
    pub start: CalendarDate,
    pub end: CalendarDate,
    pub business_days: Vec<CalendarDate>,
    pub decision: EditDecision,
}

impl WeekInfo {
    pub fn describe(
        key: PeriodKey,
        policy: &EditWindowPolicy,
        today: CalendarDate,
    ) -> Result<Self, DateError> {
        let week = key.week();
        Ok(Self {
            key,
            label: key.label()?,
            year: week.year(),
            week: week.week(),
            start: week.start_date()?,
            end: week.end_date()?,
            business_days: week.business_days()?,
            decision: policy.classify(today, week)?,
        })
    }
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn current_week(State(state): State<AppState>) -> Result<Json<WeekInfo>, AppError> {
    let resolver = &state.resolver;
    let today = resolver.today();
    let key = PeriodKey::from_date(today)?;
    Ok(Json(WeekInfo::describe(key, resolver.policy(), today)?))
}

async fn week_info(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<WeekInfo>, AppError> {
    let resolver = &state.resolver;
    let key = PeriodKey::parse(&key)?;
    Ok(Json(WeekInfo::describe(key, resolver.policy(), resolver.today())?))
}

#[derive(Debug, Deserialize)]
struct WeeksQuery {
    since: Option<String>,
}

async fn list_weeks(
    State(state): State<AppState>,
    Query(query): Query<WeeksQuery>,
) -> Result<Json<Vec<WeekOption>>, AppError> {
    let since = match query.since.as_deref() {
        Some(raw) => PeriodKey::parse(raw)?.week(),
        None => first_reporting_week()?,
    };
    let resolver = &state.resolver;
    Ok(Json(resolver.policy().selectable_weeks(resolver.today(), since)?))
}

async fn directory(State(state): State<AppState>) -> Json<Vec<BusinessUnit>> {
    Json(state.resolver.directory().units().to_vec())
}

// --- Reports ---

#[derive(Debug, Deserialize)]
struct WeekQuery {
    week: Option<String>,
}

impl WeekQuery {
    /// The requested week, or the current one.
    fn period(&self, resolver: &ReportResolver) -> Result<PeriodKey, AppError> {
        match self.week.as_deref() {
            Some(raw) => Ok(PeriodKey::parse(raw)?),
            None => Ok(PeriodKey::from_date(resolver.today())?),
        }
    }
}

async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Vec<Report>>, AppError> {
    let period = query.period(&state.resolver)?;
    Ok(Json(state.resolver.reports_for_week(period).await?))
}

async fn get_report(
    State(state): State<AppState>,
    Path((week, business_unit, division)): Path<(String, String, String)>,
) -> Result<Json<Report>, AppError> {
    let period = PeriodKey::parse(&week)?;
    state
        .resolver
        .resolve(&business_unit, &division, period)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No report for {business_unit} / {division} in {period}"
            ))
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    pub business_unit: String,
    pub division: String,
    pub week: String,
    #[serde(default)]
    pub submitted_by: String,
    #[serde(flatten)]
    pub draft: ReportDraft,
}

async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<SubmitReportRequest>,
) -> Result<Json<Report>, AppError> {
    let period = PeriodKey::parse(&request.week)?;
    info!(
        "Submission for {} / {} in {} by {}",
        request.business_unit, request.division, period, request.submitted_by
    );
    let report = state
        .resolver
        .submit(
            &request.business_unit,
            &request.division,
            period,
            request.draft,
            &request.submitted_by,
        )
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: IssueStatus,
    #[serde(default)]
    actor: String,
}

async fn update_issue_status(
    State(state): State<AppState>,
    Path((week, business_unit, division, issue_id)): Path<(String, String, String, String)>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Report>, AppError> {
    let period = PeriodKey::parse(&week)?;
    let report = state
        .resolver
        .update_issue_status(
            &business_unit,
            &division,
            period,
            &issue_id,
            update.status,
            &update.actor,
        )
        .await?;
    Ok(Json(report))
}

// --- Cross-report views ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriorityQuery {
    week: Option<String>,
    business_unit: Option<String>,
    #[serde(default)]
    sort: SortKey,
    #[serde(default)]
    order: SortOrder,
}

/// Without `week`, the board spans every report on record.
async fn priority_issues(
    State(state): State<AppState>,
    Query(query): Query<PriorityQuery>,
) -> Result<Json<Vec<PriorityIssue>>, AppError> {
    let resolver = &state.resolver;
    let reports = match query.week.as_deref() {
        Some(raw) => resolver.reports_for_week(PeriodKey::parse(raw)?).await?,
        None => resolver.all_reports().await?,
    };
    let mut board = priority::priority_board(&reports, resolver.now(), query.business_unit.as_deref());
    priority::sort_board(&mut board, query.sort, query.order);
    Ok(Json(board))
}

async fn overview(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeekOverview>, AppError> {
    let resolver = &state.resolver;
    let period = query.period(resolver)?;
    let reports = resolver.reports_for_week(period).await?;
    let decision = resolver.edit_decision(period)?;
    Ok(Json(priority::week_overview(
        resolver.directory(),
        period,
        decision,
        reports,
    )?))
}
