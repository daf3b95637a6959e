//! On-demand HTTP entry point.
//!
//! `GET /rss` runs the same pipeline as the scheduler and returns the
//! per-feed results. Config is loaded per run, so edits to the feed list
//! take effect without a restart; a config that fails to load is the one
//! unrecoverable failure and maps to a 500.

use crate::config::Config;
use crate::pipeline::{FeedResult, Pipeline};
use crate::storage::Database;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config_path: Arc<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResponse {
    results: Vec<FeedResult>,
    total_new_items: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/rss", get(run_feeds)).with_state(state)
}

async fn run_feeds(State(state): State<AppState>) -> Response {
    let config = match Config::load(&state.config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Config load failed, cannot run");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to process RSS feeds"})),
            )
                .into_response();
        }
    };

    let summary = Pipeline::new(config, state.db.clone()).run().await;
    Json(RunResponse {
        total_new_items: summary.total_new_items(),
        results: summary.results,
    })
    .into_response()
}
