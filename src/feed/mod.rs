//! Feed retrieval: bounded HTTP fetch, RSS/Atom parsing, sanitization.
//!
//! The rest of the crate never sees raw feed XML or raw entry text. A
//! [`FetchedFeed`] leaves this module with every title and description
//! already sanitized, descriptions truncated to the display budget, and
//! authorship resolved (entry creator, else entry author, else the feed's
//! configured display name).

mod fetcher;
mod parser;

pub use fetcher::{fetch_feed, FetchError, DESCRIPTION_LIMIT};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One sanitized feed entry. Constructed fresh on every fetch, never
/// mutated afterwards, never persisted individually.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Publish instant, normalized to UTC. Entries without one fall back to
    /// their `updated` timestamp, else the fetch instant.
    #[serde(rename = "pubDate")]
    pub published: DateTime<Utc>,
    pub author: String,
    /// Display name of the source this item came from.
    pub source: String,
}

/// A fully processed fetch of one feed.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedFeed {
    #[serde(rename = "feedTitle")]
    pub title: String,
    #[serde(rename = "feedDescription")]
    pub description: String,
    pub items: Vec<FeedItem>,
}
