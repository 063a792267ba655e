use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::entries::analysis::EntryAnalyzer;
use crate::summary::service::DailySummarizer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// The one summarizer instance, also driven by the scheduler.
    pub summarizer: Arc<DailySummarizer>,
    /// `None` when no AI key is configured; entries are then stored unannotated.
    pub analyzer: Option<Arc<EntryAnalyzer>>,
}
