//! Background annotation of new diary entries.
//!
//! The entry is saved with `ANALYSIS_PENDING` first; a detached task then
//! replaces it with the model's description, or clears it when the call fails
//! or the output looks like an error message.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::entries::prompts::ENTRY_ANALYSIS_PROMPT;
use crate::llm_client::{LlmClient, LlmError};
use crate::store::entries::set_analysis;
use crate::summary::validation::{validate_summary_text, FailureMarkers};

pub struct EntryAnalyzer {
    db: SqlitePool,
    llm: LlmClient,
    failure_markers: FailureMarkers,
}

impl EntryAnalyzer {
    pub fn new(db: SqlitePool, llm: LlmClient, failure_markers: FailureMarkers) -> Self {
        Self {
            db,
            llm,
            failure_markers,
        }
    }

    pub fn spawn(self: &Arc<Self>, entry_id: i64, text: String) {
        let analyzer = Arc::clone(self);
        tokio::spawn(async move {
            let result = analyzer.llm.call_text(&text, ENTRY_ANALYSIS_PROMPT).await;
            if let Err(e) =
                finish_analysis(&analyzer.db, entry_id, result, &analyzer.failure_markers).await
            {
                warn!(entry_id, "failed to store entry analysis: {e}");
            }
        });
    }
}

/// Stores the analysis, or clears the pending marker when there is nothing
/// usable. Returns what was stored.
pub async fn finish_analysis(
    db: &SqlitePool,
    entry_id: i64,
    result: Result<String, LlmError>,
    markers: &FailureMarkers,
) -> Result<Option<String>, sqlx::Error> {
    let analysis = match result {
        Ok(text) => match validate_summary_text(&text, markers) {
            Ok(valid) => Some(valid.to_string()),
            Err(rejection) => {
                warn!(entry_id, "discarding entry analysis: {rejection}");
                None
            }
        },
        Err(e) => {
            warn!(entry_id, "entry analysis failed: {e}");
            None
        }
    };

    set_analysis(db, entry_id, analysis.as_deref()).await?;
    debug!(entry_id, stored = analysis.is_some(), "entry analysis finished");
    Ok(analysis)
}
