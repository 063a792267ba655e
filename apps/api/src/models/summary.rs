use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailySummaryRow {
    pub id: i64,
    pub date: NaiveDate,
    pub summary_content: String,
    pub entry_count: i64,
    pub created_at: NaiveDateTime,
}
