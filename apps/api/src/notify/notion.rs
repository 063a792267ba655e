//! Syncs each daily summary into a Notion database as one page per day.
//!
//! The database needs a title property `Name`, a date property `Date`, a
//! rich-text property `Content` and a number property `Word Count`. A day
//! that already has a page is updated in place.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::NotionConfig;
use crate::notify::{Notifier, NotifyError, SummaryNotice};

const NOTION_API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects rich-text items longer than this.
const MAX_TEXT_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    id: String,
}

pub struct NotionNotifier {
    client: Client,
    config: NotionConfig,
}

impl NotionNotifier {
    pub fn new(config: NotionConfig, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            config,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.config.api_token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, NotifyError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn find_page_for(&self, notice: &SummaryNotice) -> Result<Option<String>, NotifyError> {
        let url = format!("{NOTION_API_URL}/databases/{}/query", self.config.database_id);
        let response = self.send(self.client.post(url).json(&date_filter(notice))).await?;
        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.results.into_iter().next().map(|p| p.id))
    }
}

#[async_trait]
impl Notifier for NotionNotifier {
    fn name(&self) -> &'static str {
        "notion"
    }

    async fn push(&self, notice: &SummaryNotice) -> Result<(), NotifyError> {
        match self.find_page_for(notice).await? {
            Some(page_id) => {
                debug!(date = %notice.date, page_id = %page_id, "updating notion page");
                let url = format!("{NOTION_API_URL}/pages/{page_id}");
                self.send(self.client.patch(url).json(&build_update(notice)))
                    .await?;
            }
            None => {
                debug!(date = %notice.date, "creating notion page");
                let url = format!("{NOTION_API_URL}/pages");
                let body = build_page(&self.config.database_id, notice);
                self.send(self.client.post(url).json(&body)).await?;
            }
        }
        Ok(())
    }
}

fn date_filter(notice: &SummaryNotice) -> Value {
    json!({
        "filter": {
            "property": "Date",
            "date": { "equals": notice.date.format("%Y-%m-%d").to_string() }
        }
    })
}

fn page_properties(notice: &SummaryNotice) -> Value {
    let content: Vec<Value> = chunk_chars(&notice.text, MAX_TEXT_CHARS)
        .into_iter()
        .map(|chunk| json!({ "type": "text", "text": { "content": chunk } }))
        .collect();

    json!({
        "Name": { "title": [{ "text": { "content": notice.date_label() } }] },
        "Date": { "date": { "start": notice.date.format("%Y-%m-%d").to_string() } },
        "Content": { "rich_text": content },
        "Word Count": { "number": notice.text.chars().count() }
    })
}

/// Payload for a new page in `database_id`.
pub fn build_page(database_id: &str, notice: &SummaryNotice) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": page_properties(notice)
    })
}

/// Payload for `PATCH /pages/:id` on the day's existing page.
pub fn build_update(notice: &SummaryNotice) -> Value {
    json!({ "properties": page_properties(notice) })
}

/// Splits `text` into pieces of at most `max_chars` chars, on char
/// boundaries.
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn notice(text: &str) -> SummaryNotice {
        SummaryNotice {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            text: text.to_string(),
            entry_count: 2,
        }
    }

    #[test]
    fn test_chunk_chars_keeps_newlines() {
        assert_eq!(chunk_chars("ab\n\ncd", 3), vec!["ab\n", "\ncd"]);
        assert!(chunk_chars("", 10).is_empty());
    }

    #[test]
    fn test_chunk_chars_respects_multibyte_chars() {
        assert_eq!(chunk_chars("今天天气很好", 4), vec!["今天天气", "很好"]);
    }

    #[test]
    fn test_build_page_shape() {
        let page = build_page("db-123", &notice("Morning run.\n\nEvening reading."));

        assert_eq!(page["parent"]["database_id"], "db-123");
        let props = &page["properties"];
        assert_eq!(props["Name"]["title"][0]["text"]["content"], "March 1, 2024");
        assert_eq!(props["Date"]["date"]["start"], "2024-03-01");
        assert_eq!(
            props["Content"]["rich_text"][0]["text"]["content"],
            "Morning run.\n\nEvening reading."
        );
        assert_eq!(props["Word Count"]["number"], 30);
    }

    #[test]
    fn test_long_content_is_split_into_rich_text_items() {
        let text = "字".repeat(MAX_TEXT_CHARS + 5);
        let page = build_page("db-123", &notice(&text));

        let items = page["properties"]["Content"]["rich_text"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(page["properties"]["Word Count"]["number"], MAX_TEXT_CHARS + 5);
    }

    #[test]
    fn test_update_targets_properties_only() {
        let update = build_update(&notice("Quiet day."));
        assert!(update.get("parent").is_none());
        assert_eq!(update["properties"]["Word Count"]["number"], 10);
    }

    #[test]
    fn test_existing_page_is_looked_up_by_date() {
        let filter = date_filter(&notice("x"));
        assert_eq!(filter["filter"]["property"], "Date");
        assert_eq!(filter["filter"]["date"]["equals"], "2024-03-01");
    }
}
