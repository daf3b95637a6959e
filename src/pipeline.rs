//! Per-run orchestration: fetch → sanitize → delta-select → summarize →
//! dispatch → advance watermark.
//!
//! One feed's failure never aborts the others; every feed contributes a
//! result entry either way. The watermark for a feed is advanced only after
//! its dispatch reports success, which is the property the whole system
//! exists to uphold.

use crate::config::{Config, FeedSource};
use crate::delta::select_new;
use crate::feed::{fetch_feed, FeedItem};
use crate::notify::{DispatchOutcome, Dispatcher, Summarizer, MAX_EMBEDS_PER_MESSAGE};
use crate::storage::{watermark_key, Database};
use serde::Serialize;
use std::time::Duration;

/// Wall-clock budget for one complete run across all feeds.
const RUN_BUDGET: Duration = Duration::from_secs(300);

/// Outcome for one feed within a run.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FeedResult {
    #[serde(rename_all = "camelCase")]
    Fetched {
        url: String,
        feed_title: String,
        feed_description: String,
        /// Full sorted item list from this fetch, newest first.
        items: Vec<FeedItem>,
        /// How many of those were selected as new this run.
        new_items_count: usize,
    },
    Failed { url: String, error: String },
}

impl FeedResult {
    pub fn new_items(&self) -> usize {
        match self {
            FeedResult::Fetched {
                new_items_count, ..
            } => *new_items_count,
            FeedResult::Failed { .. } => 0,
        }
    }
}

/// Best-effort summary of one run. Produced even when individual feeds
/// failed; only a config-load failure upstream prevents a run entirely.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub message: String,
    pub results: Vec<FeedResult>,
}

impl RunSummary {
    pub fn total_new_items(&self) -> usize {
        self.results.iter().map(FeedResult::new_items).sum()
    }
}

/// The incremental-delivery engine. Both entry points (scheduled runs and
/// the on-demand HTTP endpoint) execute this same pipeline.
pub struct Pipeline {
    config: Config,
    db: Database,
    client: reqwest::Client,
    dispatcher: Dispatcher,
    summarizer: Summarizer,
}

impl Pipeline {
    pub fn new(config: Config, db: Database) -> Self {
        let client = reqwest::Client::new();
        let dispatcher = Dispatcher::new(
            client.clone(),
            config.webhook_url(),
            config.default_color,
        );
        let summarizer =
            Summarizer::from_config(client.clone(), config.summarize, config.openai_api_key());
        Self {
            config,
            db,
            client,
            dispatcher,
            summarizer,
        }
    }

    /// Process every configured feed sequentially within the run budget.
    ///
    /// Feeds that cannot start (or finish) before the budget expires are
    /// recorded as failed entries; watermarks already advanced by earlier
    /// feeds are unaffected.
    pub async fn run(&self) -> RunSummary {
        let deadline = tokio::time::Instant::now() + RUN_BUDGET;
        let mut results = Vec::with_capacity(self.config.feeds.len());

        for source in &self.config.feeds {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                tracing::warn!(url = %source.url, "Run budget exhausted, skipping feed");
                results.push(FeedResult::Failed {
                    url: source.url.clone(),
                    error: "Run budget exhausted before this feed was processed".to_string(),
                });
                continue;
            }

            let result = match tokio::time::timeout(remaining, self.process_feed(source)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(url = %source.url, "Run budget exhausted mid-feed");
                    FeedResult::Failed {
                        url: source.url.clone(),
                        error: "Run budget exhausted while processing feed".to_string(),
                    }
                }
            };
            results.push(result);
        }

        let summary = RunSummary {
            message: "RSS feeds fetched and notifications dispatched".to_string(),
            results,
        };
        tracing::info!(
            feeds = summary.results.len(),
            new_items = summary.total_new_items(),
            "Run complete"
        );
        summary
    }

    /// Select → dispatch → persist for a single feed, in that order.
    async fn process_feed(&self, source: &FeedSource) -> FeedResult {
        let fetched = match fetch_feed(&self.client, source).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(url = %source.url, error = %e, "Feed fetch failed");
                return FeedResult::Failed {
                    url: source.url.clone(),
                    error: e.to_string(),
                };
            }
        };

        // Stable sort: equal timestamps keep their feed order.
        let mut items = fetched.items;
        items.sort_by(|a, b| b.published.cmp(&a.published));

        let key = watermark_key(&source.url);
        let watermark = match self.db.get_watermark(&key).await {
            Ok(watermark) => watermark,
            Err(e) => {
                tracing::error!(url = %source.url, error = %e, "Watermark read failed");
                return FeedResult::Failed {
                    url: source.url.clone(),
                    error: format!("Watermark read failed: {}", e),
                };
            }
        };

        let selection = select_new(&items, watermark, MAX_EMBEDS_PER_MESSAGE);
        let new_items_count = selection.items.len();

        if !selection.items.is_empty() {
            let mut batch = selection.items;
            for item in &mut batch {
                item.description = self.summarizer.rewrite(&item.description).await;
            }

            match self.dispatcher.send(source, &batch).await {
                DispatchOutcome::Sent => {
                    if let Some(candidate) = selection.watermark {
                        match self.db.advance_watermark(&key, candidate).await {
                            Ok(_) => {
                                tracing::debug!(
                                    url = %source.url,
                                    watermark = %candidate,
                                    "Watermark advanced"
                                );
                            }
                            Err(e) => {
                                // The items were delivered; a failed persist
                                // means they may be re-notified next run.
                                tracing::error!(
                                    url = %source.url,
                                    error = %e,
                                    "Watermark persist failed"
                                );
                            }
                        }
                    }
                }
                DispatchOutcome::Skipped | DispatchOutcome::Failed => {
                    tracing::info!(
                        url = %source.url,
                        items = new_items_count,
                        "Dispatch did not succeed, watermark left unchanged"
                    );
                }
            }
        }

        FeedResult::Fetched {
            url: source.url.clone(),
            feed_title: fetched.title,
            feed_description: fetched.description,
            items,
            new_items_count,
        }
    }
}
