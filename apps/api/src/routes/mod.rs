pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::entries::handlers as entry_handlers;
use crate::state::AppState;
use crate::summary::handlers as summary_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/entries",
            post(entry_handlers::handle_create_entry).get(entry_handlers::handle_list_entries),
        )
        .route(
            "/api/v1/entries/:id/analysis-status",
            get(entry_handlers::handle_analysis_status),
        )
        .route("/api/v1/summaries", get(summary_handlers::handle_list_summaries))
        .route(
            "/api/v1/summaries/generate",
            post(summary_handlers::handle_generate_summary),
        )
        .route(
            "/api/v1/summaries/:date",
            get(summary_handlers::handle_get_summary),
        )
        .with_state(state)
}
