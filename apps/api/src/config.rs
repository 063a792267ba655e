use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::summary::validation::FailureMarkers;

/// Application configuration loaded from environment variables.
/// Everything except the database has a usable default; the AI, Telegram and
/// Notion integrations are switched off when their credentials are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub ai: AiConfig,
    pub telegram: Option<TelegramConfig>,
    pub notion: Option<NotionConfig>,
    pub schedule: ScheduleConfig,
    pub lock_dir: PathBuf,
    /// Only the primary instance registers the nightly timer. Set to false on
    /// supervisor processes that fork a worker.
    pub scheduler_primary: bool,
    pub failure_markers: FailureMarkers,
    pub summary_timeout: Duration,
    pub notify_timeout: Duration,
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub summary_prompt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_token: String,
    pub database_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub timezone: Tz,
    pub hour: u32,
    pub minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timezone_name = env_or("SUMMARY_TIMEZONE", "Asia/Shanghai");
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("SUMMARY_TIMEZONE '{timezone_name}' is invalid: {e}"))?;

        let hour = parse_env("SUMMARY_HOUR", 0u32)?;
        let minute = parse_env("SUMMARY_MINUTE", 0u32)?;
        anyhow::ensure!(hour < 24, "SUMMARY_HOUR must be in 0..=23");
        anyhow::ensure!(minute < 60, "SUMMARY_MINUTE must be in 0..=59");

        let telegram = match (optional_env("TELEGRAM_BOT_TOKEN"), optional_env("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };
        let notion = match (optional_env("NOTION_API_TOKEN"), optional_env("NOTION_DATABASE_ID")) {
            (Some(api_token), Some(database_id)) => Some(NotionConfig {
                api_token,
                database_id,
            }),
            _ => None,
        };

        let failure_markers = match optional_env("SUMMARY_FAILURE_MARKERS") {
            Some(raw) => FailureMarkers::parse(&raw),
            None => FailureMarkers::default(),
        };

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://diary.db"),
            port: parse_env("PORT", 8080u16)?,
            rust_log: env_or("RUST_LOG", "info"),
            ai: AiConfig {
                api_key: optional_env("AI_API_KEY"),
                base_url: env_or("AI_BASE_URL", "https://api.openai.com/v1"),
                model: env_or("AI_MODEL", "gpt-4o-mini"),
                summary_prompt: optional_env("SUMMARY_PROMPT"),
            },
            telegram,
            notion,
            schedule: ScheduleConfig {
                timezone,
                hour,
                minute,
            },
            lock_dir: PathBuf::from(env_or("SUMMARY_LOCK_DIR", "./locks")),
            scheduler_primary: parse_bool_env("SCHEDULER_PRIMARY", true)?,
            failure_markers,
            summary_timeout: Duration::from_secs(parse_env("SUMMARY_TIMEOUT_SECS", 60u64)?),
            notify_timeout: Duration::from_secs(parse_env("NOTIFY_TIMEOUT_SECS", 30u64)?),
            admin_token: optional_env("ADMIN_TOKEN"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Returns the trimmed value, treating empty strings as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match optional_env(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{key} must be a boolean, got '{v}'"),
        },
    }
}
