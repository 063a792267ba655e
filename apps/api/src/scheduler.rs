//! Nightly trigger for the daily summary.
//!
//! One tokio task sleeps until the next `hour:minute` in the configured
//! timezone, runs `DailySummarizer::run_nightly`, and repeats. Only the
//! primary instance starts it, so a supervisor/worker pair fires once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ScheduleConfig;
use crate::summary::service::DailySummarizer;

pub struct Scheduler;

/// Running nightly task. Dropping the handle also ends the loop; `stop`
/// additionally waits for the task to finish.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Returns `None` without starting anything when `is_primary` is false.
    pub fn start(
        summarizer: Arc<DailySummarizer>,
        schedule: ScheduleConfig,
        is_primary: bool,
    ) -> Option<SchedulerHandle> {
        if !is_primary {
            info!("Not the primary instance; nightly summary scheduler disabled");
            return None;
        }

        let handle = Self::spawn_loop(schedule, move || {
            let job = Arc::clone(&summarizer);
            async move { job.run_nightly().await }
        });

        info!(
            hour = schedule.hour,
            minute = schedule.minute,
            timezone = %schedule.timezone,
            "Nightly summary scheduler started"
        );
        Some(handle)
    }

    /// Runs `job` at every fire time until the handle is stopped or dropped.
    fn spawn_loop<F, Fut>(schedule: ScheduleConfig, job: F) -> SchedulerHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&schedule.timezone);
                let next = next_fire_after(now, schedule.hour, schedule.minute);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                info!(next_run = %next, "nightly summary scheduled");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown_rx.changed() => break,
                }

                // Own task so a panic in one run cannot end the loop.
                if let Err(e) = tokio::spawn(job()).await {
                    error!("nightly summary job panicked: {e}");
                }
            }
            info!("Nightly summary scheduler stopped");
        });
        SchedulerHandle { shutdown, task }
    }
}

impl SchedulerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("scheduler task ended abnormally: {e}");
        }
    }
}

/// The first `hour:minute` strictly after `now`, in `now`'s timezone.
/// A wall-clock time skipped by a DST jump fires one hour later; an
/// ambiguous one fires at its first occurrence.
pub fn next_fire_after(now: DateTime<Tz>, hour: u32, minute: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let mut day = now.date_naive();

    loop {
        let naive = day.and_time(time);
        let candidate = tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest());
        if let Some(candidate) = candidate {
            if candidate > now {
                return candidate;
            }
        }
        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return now,
        };
    }
}
