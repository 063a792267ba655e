mod config;
mod db;
mod entries;
mod errors;
mod llm_client;
mod models;
mod notify;
mod routes;
mod scheduler;
mod state;
mod store;
mod summary;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::entries::analysis::EntryAnalyzer;
use crate::llm_client::LlmClient;
use crate::notify::notion::NotionNotifier;
use crate::notify::telegram::TelegramNotifier;
use crate::notify::Notifier;
use crate::routes::build_router;
use crate::scheduler::Scheduler;
use crate::state::AppState;
use crate::summary::service::{DailySummarizer, SummarySettings};
use crate::summary::summarizer::LlmSummarizer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on invalid values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Diary API v{}", env!("CARGO_PKG_VERSION"));

    if config.failure_markers.is_empty() {
        warn!("SUMMARY_FAILURE_MARKERS is empty; only blank summaries will be rejected");
    }

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client (optional: without a key summaries fail cleanly)
    let llm = match config.ai.api_key.clone() {
        Some(api_key) => {
            let client = LlmClient::new(
                api_key,
                &config.ai.base_url,
                config.ai.model.clone(),
                config.summary_timeout,
            )?;
            info!("LLM client initialized (model: {})", client.model());
            Some(client)
        }
        None => {
            warn!("AI_API_KEY not set; entry analysis and daily summaries are disabled");
            None
        }
    };

    // Initialize notifiers
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(telegram) = config.telegram.clone() {
        notifiers.push(Arc::new(TelegramNotifier::new(telegram, config.notify_timeout)?));
        info!("Telegram notifier enabled");
    }
    if let Some(notion) = config.notion.clone() {
        notifiers.push(Arc::new(NotionNotifier::new(notion, config.notify_timeout)?));
        info!("Notion notifier enabled");
    }

    let analyzer = llm.clone().map(|client| {
        Arc::new(EntryAnalyzer::new(
            db.clone(),
            client,
            config.failure_markers.clone(),
        ))
    });

    let summarizer = Arc::new(DailySummarizer::new(
        db.clone(),
        Arc::new(LlmSummarizer::new(llm, config.ai.summary_prompt.clone())),
        notifiers,
        SummarySettings::from_config(&config),
    ));

    let scheduler = Scheduler::start(
        Arc::clone(&summarizer),
        config.schedule,
        config.scheduler_primary,
    );

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        summarizer,
        analyzer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
