//! Summarizer — pluggable backend that turns a day's entries into one text.
//!
//! Default: `LlmSummarizer` (chat-completions call through `LlmClient`).
//! `DailySummarizer` holds an `Arc<dyn Summarizer>`, so tests swap in fakes.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::models::entry::DiaryEntryRow;
use crate::summary::prompts::DEFAULT_SUMMARY_PROMPT;

/// One entry as seen by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryInput {
    pub time: NaiveTime,
    pub text: String,
}

impl SummaryInput {
    /// Entries with nothing to say (no text, annotation or image) are dropped.
    pub fn from_entries(entries: &[DiaryEntryRow]) -> Vec<SummaryInput> {
        entries
            .iter()
            .filter_map(|e| {
                e.summary_text().map(|text| SummaryInput {
                    time: e.time(),
                    text,
                })
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("AI service not configured")]
    NotConfigured,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        date: NaiveDate,
        entries: &[SummaryInput],
    ) -> Result<String, SummarizeError>;
}

pub struct LlmSummarizer {
    llm: Option<LlmClient>,
    system_prompt: String,
}

impl LlmSummarizer {
    /// `llm` is `None` when no API key is configured; every call then fails
    /// with `NotConfigured` instead of reaching the network.
    pub fn new(llm: Option<LlmClient>, system_prompt: Option<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SUMMARY_PROMPT.to_string()),
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        date: NaiveDate,
        entries: &[SummaryInput],
    ) -> Result<String, SummarizeError> {
        let llm = self.llm.as_ref().ok_or(SummarizeError::NotConfigured)?;
        let prompt = build_summary_prompt(date, entries);
        Ok(llm.call_text(&prompt, &self.system_prompt).await?)
    }
}

/// Numbered `HH:MM - text` lines under a date heading.
pub fn build_summary_prompt(date: NaiveDate, entries: &[SummaryInput]) -> String {
    let mut prompt = format!("Diary entries for {}:\n", date.format("%Y-%m-%d"));
    for (i, entry) in entries.iter().enumerate() {
        prompt.push_str(&format!(
            "\n{}. {} - {}",
            i + 1,
            entry.time.format("%H:%M"),
            entry.text
        ));
    }
    prompt
}
