use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::TelegramConfig;
use crate::notify::{Notifier, NotifyError, SummaryNotice};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends the daily summary to one chat through the Bot API.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            config,
        })
    }
}

pub fn format_message(notice: &SummaryNotice) -> String {
    format!(
        "📖 *Daily diary summary*\n\n📅 Date: {}\n📝 Entries: {}\n\n{}\n\n---\nSent by your AI diary",
        notice.date_label(),
        notice.entry_count,
        notice.text
    )
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn push(&self, notice: &SummaryNotice) -> Result<(), NotifyError> {
        let url = format!("{TELEGRAM_API_URL}/bot{}/sendMessage", self.config.bot_token);
        let text = format_message(notice);
        let body = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text: &text,
            parse_mode: "Markdown",
        };

        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        let payload: TelegramResponse = response.json().await?;

        if !status.is_success() || !payload.ok {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message: payload
                    .description
                    .unwrap_or_else(|| "telegram sendMessage failed".to_string()),
            });
        }
        Ok(())
    }
}
