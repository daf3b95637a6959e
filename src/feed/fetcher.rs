use crate::config::FeedSource;
use crate::feed::parser::parse_feed;
use crate::feed::{FeedItem, FetchedFeed};
use crate::util::{sanitize, truncate_chars};
use chrono::Utc;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Per-feed network timeout, independent of the overall run budget.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Visible-character budget for item descriptions, ellipsis included.
pub const DESCRIPTION_LIMIT: usize = 200;

/// Errors that can occur while retrieving and parsing one feed.
///
/// Network-level problems and malformed documents are kept distinct so the
/// per-feed result entries can report which boundary failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 5-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Document could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Fetches and parses one feed into sanitized items.
///
/// A single attempt: no retries, no backoff. The request is bounded by a
/// 5-second timeout and a 10MB body cap. Every title and description in the
/// returned [`FetchedFeed`] is already sanitized; descriptions are truncated
/// to [`DESCRIPTION_LIMIT`] characters.
///
/// # Errors
///
/// - [`FetchError::Network`] / [`FetchError::Timeout`] - could not reach the feed
/// - [`FetchError::HttpStatus`] - non-2xx response
/// - [`FetchError::ResponseTooLarge`] - body over the size cap
/// - [`FetchError::Parse`] - document is not valid RSS/Atom
pub async fn fetch_feed(
    client: &reqwest::Client,
    source: &FeedSource,
) -> Result<FetchedFeed, FetchError> {
    let response = tokio::time::timeout(FETCH_TIMEOUT, client.get(&source.url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let raw = parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    let fetched_at = Utc::now();

    let items = raw
        .items
        .into_iter()
        .map(|item| {
            let description = sanitize(item.description.as_deref().unwrap_or(""));
            FeedItem {
                title: sanitize(item.title.as_deref().unwrap_or("")),
                description: truncate_chars(&description, DESCRIPTION_LIMIT).into_owned(),
                link: item.link.unwrap_or_default(),
                published: item.published.unwrap_or(fetched_at),
                // Authorship never leaves this layer empty: entry author,
                // else the feed's configured display name.
                author: item
                    .author
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| source.name.clone()),
                source: source.name.clone(),
            }
        })
        .collect();

    let title = raw
        .title
        .map(|t| sanitize(&t))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| source.name.clone());
    let description = sanitize(raw.description.as_deref().unwrap_or(""));

    Ok(FetchedFeed {
        title,
        description,
        items,
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
