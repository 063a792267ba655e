//! Push targets for finished daily summaries.
//!
//! Notification is fire-and-forget: each notifier runs in its own task with
//! its own timeout, and a failure is logged without touching the summary that
//! was already committed.

pub mod notion;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryNotice {
    pub date: NaiveDate,
    pub text: String,
    pub entry_count: usize,
}

impl SummaryNotice {
    /// Human-readable date, e.g. "March 1, 2024".
    pub fn date_label(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn push(&self, notice: &SummaryNotice) -> Result<(), NotifyError>;
}

/// Spawns one detached task per notifier. The returned handles are only
/// useful to callers that want to wait (tests); production code drops them.
pub fn dispatch(
    notifiers: &[Arc<dyn Notifier>],
    notice: SummaryNotice,
    timeout: Duration,
) -> Vec<JoinHandle<()>> {
    let notice = Arc::new(notice);
    notifiers
        .iter()
        .map(|notifier| {
            let notifier = Arc::clone(notifier);
            let notice = Arc::clone(&notice);
            tokio::spawn(async move {
                let result = match tokio::time::timeout(timeout, notifier.push(&notice)).await {
                    Ok(result) => result,
                    Err(_) => Err(NotifyError::Timeout(timeout)),
                };
                match result {
                    Ok(()) => info!(date = %notice.date, notifier = notifier.name(), "summary pushed"),
                    Err(e) => error!(date = %notice.date, notifier = notifier.name(), "summary push failed: {e}"),
                }
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn notice() -> SummaryNotice {
        SummaryNotice {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            text: "A good day.".to_string(),
            entry_count: 3,
        }
    }

    #[test]
    fn test_date_label() {
        assert_eq!(notice().date_label(), "March 1, 2024");
    }

    #[tokio::test]
    async fn test_dispatch_reaches_every_notifier_despite_failures() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifiers: Vec<Arc<dyn Notifier>> = vec![
            Arc::new(FailingNotifier),
            recorder.clone(),
            Arc::new(HangingNotifier),
        ];

        let handles = dispatch(&notifiers, notice(), Duration::from_millis(50));
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(recorder.received.lock().unwrap().as_slice(), &[notice()]);
    }
}
