use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates the SQLite connection pool, creating the database file when
/// missing, and applies the schema.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    setup_schema(&pool).await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates the tables if they do not exist yet.
pub async fn setup_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS diary_entries (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp        TEXT NOT NULL,
            text_content     TEXT,
            image_path       TEXT,
            ai_analysis      TEXT,
            is_daily_summary INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_diary_entries_timestamp ON diary_entries (timestamp)",
    )
    .execute(pool)
    .await?;

    // UNIQUE(date) backs the one-summary-per-day rule at the storage level.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_summaries (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            date            TEXT NOT NULL UNIQUE,
            summary_content TEXT NOT NULL,
            entry_count     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
