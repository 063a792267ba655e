use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::entry::DiaryEntryRow;

pub struct NewEntry<'a> {
    pub timestamp: NaiveDateTime,
    pub text_content: Option<&'a str>,
    pub image_path: Option<&'a str>,
    pub ai_analysis: Option<&'a str>,
}

pub async fn insert_entry(
    pool: &SqlitePool,
    entry: NewEntry<'_>,
    created_at: NaiveDateTime,
) -> Result<DiaryEntryRow, sqlx::Error> {
    sqlx::query_as::<_, DiaryEntryRow>(
        r#"
        INSERT INTO diary_entries
            (timestamp, text_content, image_path, ai_analysis, is_daily_summary, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(entry.timestamp)
    .bind(entry.text_content)
    .bind(entry.image_path)
    .bind(entry.ai_analysis)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub async fn get_entry(pool: &SqlitePool, id: i64) -> Result<Option<DiaryEntryRow>, sqlx::Error> {
    sqlx::query_as::<_, DiaryEntryRow>("SELECT * FROM diary_entries WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn set_analysis(
    pool: &SqlitePool,
    id: i64,
    analysis: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE diary_entries SET ai_analysis = ? WHERE id = ?")
        .bind(analysis)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Raw (non-summary) entries on `date`, oldest first. This is the input of the
/// daily summary.
pub async fn raw_entries_for_date(
    pool: &SqlitePool,
    date: NaiveDate,
) -> Result<Vec<DiaryEntryRow>, sqlx::Error> {
    sqlx::query_as::<_, DiaryEntryRow>(
        r#"
        SELECT * FROM diary_entries
        WHERE date(timestamp) = ? AND is_daily_summary = 0
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await
}

/// Entries on `date` for display. Summary entries are only included in the
/// history view.
pub async fn entries_for_date(
    pool: &SqlitePool,
    date: NaiveDate,
    include_summaries: bool,
) -> Result<Vec<DiaryEntryRow>, sqlx::Error> {
    if !include_summaries {
        return raw_entries_for_date(pool, date).await;
    }
    sqlx::query_as::<_, DiaryEntryRow>(
        "SELECT * FROM diary_entries WHERE date(timestamp) = ? ORDER BY timestamp ASC, id ASC",
    )
    .bind(date)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub async fn summary_entries_for_date(
    pool: &SqlitePool,
    date: NaiveDate,
) -> Result<Vec<DiaryEntryRow>, sqlx::Error> {
    sqlx::query_as::<_, DiaryEntryRow>(
        "SELECT * FROM diary_entries WHERE date(timestamp) = ? AND is_daily_summary = 1 ORDER BY id",
    )
    .bind(date)
    .fetch_all(pool)
    .await
}

/// Removes every summary-flagged entry on `date`. Returns how many were removed.
pub async fn delete_summary_entries(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM diary_entries WHERE date(timestamp) = ? AND is_daily_summary = 1",
    )
    .bind(date)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn insert_summary_entry(
    conn: &mut SqliteConnection,
    text: &str,
    timestamp: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO diary_entries
            (timestamp, text_content, image_path, ai_analysis, is_daily_summary, created_at)
        VALUES (?, ?, NULL, NULL, 1, ?)
        "#,
    )
    .bind(timestamp)
    .bind(text)
    .bind(timestamp)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}
