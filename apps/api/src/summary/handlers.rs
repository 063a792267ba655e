//! Axum route handlers for daily summaries.

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::summary::DailySummaryRow;
use crate::state::AppState;
use crate::store::summaries;
use crate::summary::service::ManualRunResponse;

const DEFAULT_LIST_DAYS: i64 = 365;
const MAX_LIST_DAYS: i64 = 36_500;

#[derive(Debug, Deserialize)]
pub struct GenerateSummaryRequest {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSummariesQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryListResponse {
    pub success: bool,
    pub summaries: Vec<DailySummaryRow>,
}

#[derive(Debug, Serialize)]
pub struct SummaryDetailResponse {
    pub success: bool,
    pub summary: DailySummaryRow,
}

/// When `ADMIN_TOKEN` is set, requires `Authorization: Bearer <token>`.
fn check_admin_token(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = config.admin_token.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

fn manual_failure(status: StatusCode, message: &str) -> (StatusCode, Json<ManualRunResponse>) {
    (
        status,
        Json(ManualRunResponse {
            success: false,
            message: message.to_string(),
            summary: None,
        }),
    )
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

/// POST /api/v1/summaries/generate
///
/// Regenerates the summary for `date`, replacing any existing one.
pub async fn handle_generate_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateSummaryRequest>,
) -> Result<(StatusCode, Json<ManualRunResponse>), AppError> {
    check_admin_token(&state.config, &headers)?;

    let Some(raw_date) = request.date.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Ok(manual_failure(StatusCode::BAD_REQUEST, "date is required"));
    };
    let Ok(date) = parse_date(raw_date) else {
        return Ok(manual_failure(
            StatusCode::BAD_REQUEST,
            "invalid date format, expected YYYY-MM-DD",
        ));
    };
    if date > state.summarizer.today() {
        return Ok(manual_failure(
            StatusCode::BAD_REQUEST,
            "cannot summarize a future date",
        ));
    }

    let response = state.summarizer.run_manual(date).await;
    let status = match (response.success, response.summary.is_some()) {
        (true, true) => StatusCode::CREATED,
        (true, false) => StatusCode::OK,
        (false, _) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(response)))
}

/// GET /api/v1/summaries?days=N
pub async fn handle_list_summaries(
    State(state): State<AppState>,
    Query(query): Query<ListSummariesQuery>,
) -> Result<Json<SummaryListResponse>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_LIST_DAYS);
    if !(0..=MAX_LIST_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "days must be between 0 and {MAX_LIST_DAYS}"
        )));
    }
    let summaries = summaries::list_summaries(&state.db, state.summarizer.today(), days).await?;
    Ok(Json(SummaryListResponse {
        success: true,
        summaries,
    }))
}

/// GET /api/v1/summaries/:date
pub async fn handle_get_summary(
    State(state): State<AppState>,
    Path(raw_date): Path<String>,
) -> Result<Json<SummaryDetailResponse>, AppError> {
    let date = parse_date(&raw_date)?;
    let summary = summaries::get_summary(&state.db, date)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No summary for {date}")))?;
    Ok(Json(SummaryDetailResponse {
        success: true,
        summary,
    }))
}
