use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder annotation stored while the entry is being analysed.
pub const ANALYSIS_PENDING: &str = "AI analysis in progress...";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiaryEntryRow {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub text_content: Option<String>,
    pub image_path: Option<String>,
    pub ai_analysis: Option<String>,
    pub is_daily_summary: bool,
    pub created_at: NaiveDateTime,
}

impl DiaryEntryRow {
    /// Annotation, unless it is missing, blank or still the pending sentinel.
    pub fn finished_analysis(&self) -> Option<&str> {
        self.ai_analysis
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty() && *a != ANALYSIS_PENDING)
    }

    pub fn is_analyzing(&self) -> bool {
        self.ai_analysis.as_deref() == Some(ANALYSIS_PENDING)
    }

    /// Text fed to the day summary: the finished annotation when available,
    /// otherwise the raw text, otherwise an image placeholder.
    pub fn summary_text(&self) -> Option<String> {
        if let Some(analysis) = self.finished_analysis() {
            return Some(analysis.to_string());
        }
        if let Some(text) = self
            .text_content
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Some(text.to_string());
        }
        self.image_path.as_ref().map(|_| "[image]".to_string())
    }

    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}
