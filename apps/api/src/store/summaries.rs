use chrono::{Days, NaiveDate, NaiveDateTime};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::models::summary::DailySummaryRow;
use crate::store::entries::{delete_summary_entries, insert_summary_entry};

pub async fn get_summary(
    pool: &SqlitePool,
    date: NaiveDate,
) -> Result<Option<DailySummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, DailySummaryRow>("SELECT * FROM daily_summaries WHERE date = ?")
        .bind(date)
        .fetch_optional(pool)
        .await
}

/// Summaries from the last `days` days up to `today`, newest first.
pub async fn list_summaries(
    pool: &SqlitePool,
    today: NaiveDate,
    days: i64,
) -> Result<Vec<DailySummaryRow>, sqlx::Error> {
    let start = u64::try_from(days.max(0))
        .ok()
        .and_then(|days| today.checked_sub_days(Days::new(days)))
        .unwrap_or(NaiveDate::MIN);
    sqlx::query_as::<_, DailySummaryRow>(
        "SELECT * FROM daily_summaries WHERE date >= ? AND date <= ? ORDER BY date DESC",
    )
    .bind(start)
    .bind(today)
    .fetch_all(pool)
    .await
}

/// Updates the row for `date` in place, or inserts it when missing. Never
/// produces a second row for the same date.
pub async fn upsert_summary(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    text: &str,
    entry_count: i64,
    created_at: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO daily_summaries (date, summary_content, entry_count, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(date) DO UPDATE SET
            summary_content = excluded.summary_content,
            entry_count = excluded.entry_count
        "#,
    )
    .bind(date)
    .bind(text)
    .bind(entry_count)
    .bind(created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Writes the summary row and its display entry for `date` as one unit:
/// upsert the row, drop any earlier summary entries for the day, insert the
/// new one at `entry_timestamp`. Either all of it commits or none of it does.
pub async fn commit_summary(
    pool: &SqlitePool,
    date: NaiveDate,
    text: &str,
    entry_count: i64,
    entry_timestamp: NaiveDateTime,
    created_at: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    upsert_summary(&mut *tx, date, text, entry_count, created_at).await?;
    let removed = delete_summary_entries(&mut *tx, date).await?;
    let entry_id = insert_summary_entry(&mut *tx, text, entry_timestamp).await?;

    tx.commit().await?;

    debug!(%date, removed, entry_id, "summary committed");
    Ok(())
}
