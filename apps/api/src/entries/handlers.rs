//! Axum route handlers for diary entries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::entry::{DiaryEntryRow, ANALYSIS_PENDING};
use crate::state::AppState;
use crate::store::entries::{self, NewEntry};
use crate::summary::handlers::parse_date;

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub text_content: Option<String>,
    pub image_path: Option<String>,
    /// Local time in the service timezone; defaults to now.
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    pub date: Option<String>,
    /// `history` includes the synthesized daily-summary entries.
    pub view: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub success: bool,
    pub entry: DiaryEntryRow,
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub success: bool,
    pub entries: Vec<DiaryEntryRow>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisStatusResponse {
    pub success: bool,
    pub entry_id: i64,
    pub ai_analysis: Option<String>,
    pub is_analyzing: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/v1/entries
pub async fn handle_create_entry(
    State(state): State<AppState>,
    Json(request): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let text = non_blank(request.text_content);
    let image_path = non_blank(request.image_path);
    if text.is_none() && image_path.is_none() {
        return Err(AppError::Validation(
            "an entry needs text_content or image_path".to_string(),
        ));
    }

    let now = state.summarizer.now_local();
    let timestamp = request.timestamp.unwrap_or(now);
    if timestamp > now {
        return Err(AppError::Validation(
            "timestamp must not be in the future".to_string(),
        ));
    }

    let analyze = state.analyzer.as_ref().zip(text.clone());
    let entry = entries::insert_entry(
        &state.db,
        NewEntry {
            timestamp,
            text_content: text.as_deref(),
            image_path: image_path.as_deref(),
            ai_analysis: analyze.as_ref().map(|_| ANALYSIS_PENDING),
        },
        now,
    )
    .await?;

    info!(entry_id = entry.id, "diary entry created");

    if let Some((analyzer, text)) = analyze {
        analyzer.spawn(entry.id, text);
    }

    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            success: true,
            entry,
        }),
    ))
}

/// GET /api/v1/entries?date=YYYY-MM-DD&view=history
pub async fn handle_list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<EntryListResponse>, AppError> {
    let date = match query.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => state.summarizer.today(),
    };
    let include_summaries = query.view.as_deref() == Some("history");
    let entries = entries::entries_for_date(&state.db, date, include_summaries).await?;
    Ok(Json(EntryListResponse {
        success: true,
        entries,
    }))
}

/// GET /api/v1/entries/:id/analysis-status
pub async fn handle_analysis_status(
    State(state): State<AppState>,
    Path(entry_id): Path<i64>,
) -> Result<Json<AnalysisStatusResponse>, AppError> {
    let entry = entries::get_entry(&state.db, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {entry_id} not found")))?;
    Ok(Json(AnalysisStatusResponse {
        success: true,
        entry_id,
        is_analyzing: entry.is_analyzing(),
        ai_analysis: entry.ai_analysis,
    }))
}
