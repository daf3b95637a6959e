use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::parser;

/// A feed entry as parsed from the document, before sanitization.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

/// Channel-level metadata plus the flat entry list.
#[derive(Debug, Clone)]
pub struct RawFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<RawItem>,
}

/// Parse an RSS or Atom document into a flat ordered entry sequence.
///
/// feed-rs normalizes both upstream shapes (RSS channel wrapper, Atom entry
/// array) into one entry list, so downstream code only ever sees `RawItem`s
/// in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeed> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            // Prefer the explicit publish date; Atom-only feeds often carry
            // just `updated`.
            let published = entry.published.or(entry.updated);
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body));
            // dc:creator and <author> both land in `authors`.
            let author = entry
                .authors
                .into_iter()
                .map(|person| person.name)
                .find(|name| !name.trim().is_empty());

            RawItem {
                title: entry.title.map(|t| t.content),
                description,
                link,
                published,
                author,
            }
        })
        .collect();

    Ok(RawFeed {
        title: feed.title.map(|t| t.content),
        description: feed.description.map(|d| d.content),
        items,
    })
}
