//! DailySummarizer — produces, stores and announces one summary per day.
//!
//! Flow for one date (under the per-date file lock):
//!   existing? → raw entries → summarizer (bounded) → validate → commit → notify
//!
//! Skips (already summarized, no entries, lock held elsewhere) are outcomes,
//! not errors. Everything that stops a summary from being written is a
//! `SummaryError`, and nothing is persisted in that case.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::notify::{self, Notifier, SummaryNotice};
use crate::store::{entries, summaries};
use crate::summary::guard::DateLock;
use crate::summary::summarizer::{SummarizeError, Summarizer, SummaryInput};
use crate::summary::validation::{validate_summary_text, FailureMarkers, Rejection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated { text: String, entry_count: usize },
    AlreadyExists { text: String },
    SkippedNoEntries,
    SkippedAlreadyRunning,
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("date {date} is in the future (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    #[error("could not open summary lock: {0}")]
    Lock(#[source] io::Error),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("summarizer failed: {0}")]
    Summarizer(#[from] SummarizeError),

    #[error("summarizer timed out after {0:?}")]
    Timeout(Duration),

    #[error("summary rejected: {0}")]
    Rejected(#[from] Rejection),
}

/// Body of the manual trigger response: `{success, message}` or
/// `{success, message, summary}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManualRunResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Tunables for `DailySummarizer`.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub lock_dir: PathBuf,
    pub failure_markers: FailureMarkers,
    pub timezone: Tz,
    pub summary_timeout: Duration,
    pub notify_timeout: Duration,
}

impl SummarySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lock_dir: config.lock_dir.clone(),
            failure_markers: config.failure_markers.clone(),
            timezone: config.schedule.timezone,
            summary_timeout: config.summary_timeout,
            notify_timeout: config.notify_timeout,
        }
    }
}

/// Display time of the synthesized summary entry.
fn summary_entry_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

pub struct DailySummarizer {
    db: SqlitePool,
    summarizer: Arc<dyn Summarizer>,
    notifiers: Vec<Arc<dyn Notifier>>,
    settings: SummarySettings,
}

impl DailySummarizer {
    pub fn new(
        db: SqlitePool,
        summarizer: Arc<dyn Summarizer>,
        notifiers: Vec<Arc<dyn Notifier>>,
        settings: SummarySettings,
    ) -> Self {
        Self {
            db,
            summarizer,
            notifiers,
            settings,
        }
    }

    /// Wall-clock time in the service timezone.
    pub fn now_local(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.settings.timezone).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now_local().date()
    }

    /// Generates the summary for `date` at most once. With `force_update` an
    /// existing summary is regenerated and replaced in place.
    pub async fn generate_for_date(
        &self,
        date: NaiveDate,
        force_update: bool,
    ) -> Result<GenerationOutcome, SummaryError> {
        let today = self.today();
        if date > today {
            return Err(SummaryError::FutureDate { date, today });
        }

        let Some(guard) =
            DateLock::try_acquire(&self.settings.lock_dir, date).map_err(SummaryError::Lock)?
        else {
            info!(%date, "summary generation already running, skipping");
            return Ok(GenerationOutcome::SkippedAlreadyRunning);
        };
        debug!(date = %guard.date(), lock = %guard.path().display(), "summary lock acquired");

        self.generate_locked(date, force_update).await
    }

    async fn generate_locked(
        &self,
        date: NaiveDate,
        force_update: bool,
    ) -> Result<GenerationOutcome, SummaryError> {
        if !force_update {
            if let Some(existing) = summaries::get_summary(&self.db, date).await? {
                info!(%date, "summary already exists, skipping");
                return Ok(GenerationOutcome::AlreadyExists {
                    text: existing.summary_content,
                });
            }
        }

        let raw_entries = entries::raw_entries_for_date(&self.db, date).await?;
        let inputs = SummaryInput::from_entries(&raw_entries);
        if inputs.is_empty() {
            info!(%date, "no diary entries, skipping summary");
            return Ok(GenerationOutcome::SkippedNoEntries);
        }
        let entry_count = raw_entries.len();

        info!(%date, entry_count, force_update, "generating daily summary");

        let timeout = self.settings.summary_timeout;
        let raw_text = tokio::time::timeout(timeout, self.summarizer.summarize(date, &inputs))
            .await
            .map_err(|_| SummaryError::Timeout(timeout))??;

        let text = validate_summary_text(&raw_text, &self.settings.failure_markers)?.to_string();

        summaries::commit_summary(
            &self.db,
            date,
            &text,
            entry_count as i64,
            date.and_time(summary_entry_time()),
            self.now_local(),
        )
        .await?;

        info!(%date, entry_count, "daily summary saved");

        notify::dispatch(
            &self.notifiers,
            SummaryNotice {
                date,
                text: text.clone(),
                entry_count,
            },
            self.settings.notify_timeout,
        );

        Ok(GenerationOutcome::Generated { text, entry_count })
    }

    /// Nightly entry point: summarizes yesterday. Never fails; problems are
    /// logged.
    pub async fn run_nightly(&self) {
        let Some(yesterday) = self.today().pred_opt() else {
            warn!("no previous day to summarize");
            return;
        };

        match self.generate_for_date(yesterday, false).await {
            Ok(GenerationOutcome::Generated { entry_count, .. }) => {
                info!(date = %yesterday, entry_count, "nightly summary generated")
            }
            Ok(GenerationOutcome::AlreadyExists { .. }) => {
                info!(date = %yesterday, "nightly summary already present")
            }
            Ok(GenerationOutcome::SkippedNoEntries) => {
                info!(date = %yesterday, "nightly summary skipped: no entries")
            }
            Ok(GenerationOutcome::SkippedAlreadyRunning) => {
                info!(date = %yesterday, "nightly summary skipped: already running")
            }
            Err(e) => error!(date = %yesterday, "nightly summary failed: {e}"),
        }
    }

    /// Operator entry point: always regenerates `date`.
    pub async fn run_manual(&self, date: NaiveDate) -> ManualRunResponse {
        match self.generate_for_date(date, true).await {
            Ok(GenerationOutcome::Generated { text, .. })
            | Ok(GenerationOutcome::AlreadyExists { text }) => ManualRunResponse {
                success: true,
                message: format!("Daily summary for {date} generated"),
                summary: Some(text),
            },
            Ok(GenerationOutcome::SkippedNoEntries) => ManualRunResponse {
                success: true,
                message: format!("No diary entries for {date}, nothing to summarize"),
                summary: None,
            },
            Ok(GenerationOutcome::SkippedAlreadyRunning) => ManualRunResponse {
                success: true,
                message: format!("A summary for {date} is already being generated"),
                summary: None,
            },
            Err(e) => {
                error!(%date, "manual summary failed: {e}");
                ManualRunResponse {
                    success: false,
                    message: format!("Failed to generate summary: {e}"),
                    summary: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::db::test_support::{test_db, TestDb};
    use crate::llm_client::LlmError;
    use crate::notify::test_support::{FailingNotifier, RecordingNotifier};
    use crate::store::entries::{insert_entry, summary_entries_for_date, NewEntry};

    /// Joins the inputs it receives and records every call.
    #[derive(Default)]
    struct EchoSummarizer {
        calls: Mutex<Vec<Vec<SummaryInput>>>,
    }

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        async fn summarize(
            &self,
            _date: NaiveDate,
            entries: &[SummaryInput],
        ) -> Result<String, SummarizeError> {
            self.calls.lock().unwrap().push(entries.to_vec());
            let texts: Vec<_> = entries.iter().map(|e| e.text.as_str()).collect();
            Ok(format!("Summary: {}", texts.join("; ")))
        }
    }

    struct FixedSummarizer(&'static str);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(
            &self,
            _date: NaiveDate,
            _entries: &[SummaryInput],
        ) -> Result<String, SummarizeError> {
            Ok(self.0.to_string())
        }
    }

    struct ErrorSummarizer;

    #[async_trait]
    impl Summarizer for ErrorSummarizer {
        async fn summarize(
            &self,
            _date: NaiveDate,
            _entries: &[SummaryInput],
        ) -> Result<String, SummarizeError> {
            Err(SummarizeError::Llm(LlmError::EmptyContent))
        }
    }

    /// Signals `started`, then waits for `release` before answering.
    #[derive(Default)]
    struct GatedSummarizer {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Summarizer for GatedSummarizer {
        async fn summarize(
            &self,
            _date: NaiveDate,
            _entries: &[SummaryInput],
        ) -> Result<String, SummarizeError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("gated summary".to_string())
        }
    }

    struct NeverSummarizer;

    #[async_trait]
    impl Summarizer for NeverSummarizer {
        async fn summarize(
            &self,
            _date: NaiveDate,
            _entries: &[SummaryInput],
        ) -> Result<String, SummarizeError> {
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn service(
        db: &TestDb,
        summarizer: Arc<dyn Summarizer>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> DailySummarizer {
        DailySummarizer::new(
            db.pool.clone(),
            summarizer,
            notifiers,
            SummarySettings {
                lock_dir: db.dir.path().join("locks"),
                failure_markers: FailureMarkers::default(),
                timezone: chrono_tz::Asia::Shanghai,
                summary_timeout: Duration::from_secs(5),
                notify_timeout: Duration::from_secs(1),
            },
        )
    }

    async fn add_entry(pool: &SqlitePool, ts: NaiveDateTime, text: &str) {
        let entry = NewEntry {
            timestamp: ts,
            text_content: Some(text),
            image_path: None,
            ai_analysis: None,
        };
        insert_entry(pool, entry, ts).await.unwrap();
    }

    async fn summary_row_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM daily_summaries")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_is_idempotent_without_force() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let echo = Arc::new(EchoSummarizer::default());
        let svc = service(&db, echo.clone(), vec![]);

        let first = svc.generate_for_date(day(), false).await.unwrap();
        let second = svc.generate_for_date(day(), false).await.unwrap();

        assert_eq!(
            first,
            GenerationOutcome::Generated {
                text: "Summary: coffee".to_string(),
                entry_count: 1
            }
        );
        assert_eq!(
            second,
            GenerationOutcome::AlreadyExists {
                text: "Summary: coffee".to_string()
            }
        );
        assert_eq!(echo.calls.lock().unwrap().len(), 1);
        assert_eq!(summary_row_count(&db.pool).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_generation_for_same_date_runs_once() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let gated = Arc::new(GatedSummarizer::default());
        let svc = Arc::new(service(&db, gated.clone(), vec![]));

        let first = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.generate_for_date(day(), false).await })
        };
        gated.started.notified().await;

        let second = svc.generate_for_date(day(), false).await.unwrap();
        assert_eq!(second, GenerationOutcome::SkippedAlreadyRunning);
        assert_eq!(summary_row_count(&db.pool).await, 0);

        gated.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, GenerationOutcome::Generated { .. }));
        assert_eq!(summary_row_count(&db.pool).await, 1);
    }

    #[tokio::test]
    async fn test_no_entries_is_a_skip_and_writes_nothing() {
        let db = test_db().await;
        let svc = service(&db, Arc::new(EchoSummarizer::default()), vec![]);

        let outcome = svc.generate_for_date(day(), false).await.unwrap();

        assert_eq!(outcome, GenerationOutcome::SkippedNoEntries);
        assert_eq!(summary_row_count(&db.pool).await, 0);
    }

    #[tokio::test]
    async fn test_failure_marker_output_is_not_persisted() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(
            &db,
            Arc::new(FixedSummarizer("Daily summary generation failed: 401")),
            vec![],
        );

        let err = svc.generate_for_date(day(), false).await.unwrap_err();

        assert!(matches!(
            err,
            SummaryError::Rejected(Rejection::FailureMarker(_))
        ));
        assert_eq!(summary_row_count(&db.pool).await, 0);
        assert!(summary_entries_for_date(&db.pool, day())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_blank_output_is_rejected() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(&db, Arc::new(FixedSummarizer("   ")), vec![]);

        let err = svc.generate_for_date(day(), false).await.unwrap_err();

        assert!(matches!(err, SummaryError::Rejected(Rejection::Empty)));
        assert_eq!(summary_row_count(&db.pool).await, 0);
    }

    #[tokio::test]
    async fn test_summarizer_error_is_reported_not_persisted() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(&db, Arc::new(ErrorSummarizer), vec![]);

        let err = svc.generate_for_date(day(), false).await.unwrap_err();

        assert!(matches!(err, SummaryError::Summarizer(_)));
        assert_eq!(summary_row_count(&db.pool).await, 0);
    }

    #[tokio::test]
    async fn test_summarizer_timeout_is_a_failure() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let mut svc = service(&db, Arc::new(NeverSummarizer), vec![]);
        svc.settings.summary_timeout = Duration::from_millis(50);

        let err = svc.generate_for_date(day(), false).await.unwrap_err();

        assert!(matches!(err, SummaryError::Timeout(_)));
        assert_eq!(summary_row_count(&db.pool).await, 0);
    }

    #[tokio::test]
    async fn test_lock_is_released_after_failure() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let failing = service(&db, Arc::new(ErrorSummarizer), vec![]);
        assert!(failing.generate_for_date(day(), false).await.is_err());

        let working = service(&db, Arc::new(EchoSummarizer::default()), vec![]);
        let outcome = working.generate_for_date(day(), false).await.unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated { .. }));
    }

    #[tokio::test]
    async fn test_force_update_replaces_summary_and_summary_entry() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(&db, Arc::new(EchoSummarizer::default()), vec![]);
        svc.generate_for_date(day(), false).await.unwrap();

        add_entry(&db.pool, at(20, 0), "dinner").await;
        let outcome = svc.generate_for_date(day(), true).await.unwrap();

        assert_eq!(
            outcome,
            GenerationOutcome::Generated {
                text: "Summary: coffee; dinner".to_string(),
                entry_count: 2
            }
        );
        assert_eq!(summary_row_count(&db.pool).await, 1);
        let row = summaries::get_summary(&db.pool, day())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.summary_content, "Summary: coffee; dinner");
        assert_eq!(row.entry_count, 2);

        let summary_entries = summary_entries_for_date(&db.pool, day()).await.unwrap();
        assert_eq!(summary_entries.len(), 1);
        assert_eq!(
            summary_entries[0].text_content.as_deref(),
            Some("Summary: coffee; dinner")
        );
        assert_eq!(summary_entries[0].timestamp, at(23, 59) + chrono::Duration::seconds(59));
    }

    #[tokio::test]
    async fn test_entries_are_fed_in_chronological_order() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "nine").await;
        add_entry(&db.pool, at(14, 0), "fourteen").await;
        add_entry(&db.pool, at(11, 0), "eleven").await;
        let echo = Arc::new(EchoSummarizer::default());
        let svc = service(&db, echo.clone(), vec![]);

        svc.generate_for_date(day(), false).await.unwrap();

        let calls = echo.calls.lock().unwrap();
        let times: Vec<_> = calls[0]
            .iter()
            .map(|i| i.time.format("%H:%M").to_string())
            .collect();
        assert_eq!(times, vec!["09:00", "11:00", "14:00"]);
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_undo_summary() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(
            &db,
            Arc::new(EchoSummarizer::default()),
            vec![Arc::new(FailingNotifier)],
        );

        let outcome = svc.generate_for_date(day(), false).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(outcome, GenerationOutcome::Generated { .. }));
        assert!(summaries::get_summary(&db.pool, day())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_notifiers_receive_the_saved_summary() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        add_entry(&db.pool, at(10, 0), "walk").await;
        let recorder = Arc::new(RecordingNotifier::default());
        let svc = service(
            &db,
            Arc::new(EchoSummarizer::default()),
            vec![recorder.clone()],
        );

        svc.generate_for_date(day(), false).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..100 {
            received = recorder.received.lock().unwrap().clone();
            if !received.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            received,
            vec![SummaryNotice {
                date: day(),
                text: "Summary: coffee; walk".to_string(),
                entry_count: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_future_date_is_rejected() {
        let db = test_db().await;
        let svc = service(&db, Arc::new(EchoSummarizer::default()), vec![]);
        let future = svc.today().succ_opt().unwrap();

        let err = svc.generate_for_date(future, false).await.unwrap_err();

        assert!(matches!(err, SummaryError::FutureDate { .. }));
    }

    #[tokio::test]
    async fn test_run_nightly_summarizes_yesterday() {
        let db = test_db().await;
        let svc = service(&db, Arc::new(EchoSummarizer::default()), vec![]);
        let yesterday = svc.today().pred_opt().unwrap();
        add_entry(&db.pool, yesterday.and_hms_opt(8, 0, 0).unwrap(), "yesterday").await;
        add_entry(&db.pool, svc.now_local(), "today").await;

        svc.run_nightly().await;

        let row = summaries::get_summary(&db.pool, yesterday)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.summary_content, "Summary: yesterday");
    }

    #[tokio::test]
    async fn test_run_manual_reports_success_with_summary() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(&db, Arc::new(EchoSummarizer::default()), vec![]);

        let response = svc.run_manual(day()).await;

        assert!(response.success);
        assert_eq!(response.summary.as_deref(), Some("Summary: coffee"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["summary"], "Summary: coffee");
    }

    #[tokio::test]
    async fn test_run_manual_no_entries_is_not_a_failure() {
        let db = test_db().await;
        let svc = service(&db, Arc::new(EchoSummarizer::default()), vec![]);

        let response = svc.run_manual(day()).await;

        assert!(response.success);
        assert!(response.summary.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("summary").is_none());
    }

    #[tokio::test]
    async fn test_run_manual_reports_failure_message() {
        let db = test_db().await;
        add_entry(&db.pool, at(9, 0), "coffee").await;
        let svc = service(
            &db,
            Arc::new(FixedSummarizer("AI service not configured")),
            vec![],
        );

        let response = svc.run_manual(day()).await;

        assert!(!response.success);
        assert!(response.message.contains("service not configured"));
        assert!(response.summary.is_none());
    }
}
