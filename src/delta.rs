//! Delta selection: which items are "new" relative to a feed's watermark.
//!
//! Pure logic, no I/O. The caller fetches, sorts, and persists; this module
//! only decides what to notify and what the watermark should become once
//! that notification is confirmed delivered.

use crate::feed::FeedItem;
use chrono::{DateTime, Utc};

/// Items notified the first time a feed is ever observed.
///
/// A deliberate anti-spam heuristic: a freshly added feed with a large
/// backlog surfaces only its newest few items instead of the whole archive.
pub const FIRST_RUN_LIMIT: usize = 5;

/// The outcome of delta selection for one feed.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Items to notify, newest first. Empty means "no update".
    pub items: Vec<FeedItem>,
    /// Watermark value to persist after the dispatch for `items` succeeds.
    /// `None` when there is nothing to dispatch.
    pub watermark: Option<DateTime<Utc>>,
}

/// Selects the items to notify from a feed's full item list.
///
/// `items` must be sorted strictly descending by publish timestamp, ties
/// kept in original feed order (a stable sort upstream guarantees this).
///
/// - No watermark (first-ever observation): the newest
///   [`FIRST_RUN_LIMIT`] items regardless of age, and the watermark
///   candidate is the newest item's timestamp.
/// - Watermark present: every item published strictly after it. An item
///   published exactly at the watermark is never re-selected, which makes
///   selection idempotent under replay.
/// - When the selection exceeds `dispatch_cap`, only the oldest
///   `dispatch_cap` items are kept and the candidate is the newest *kept*
///   timestamp, so the newer remainder is selected again next cycle instead
///   of being silently skipped past.
/// - Empty input: empty selection, no watermark candidate.
pub fn select_new(
    items: &[FeedItem],
    watermark: Option<DateTime<Utc>>,
    dispatch_cap: usize,
) -> Selection {
    let Some(newest) = items.first() else {
        return Selection::default();
    };

    match watermark {
        None => Selection {
            items: items.iter().take(FIRST_RUN_LIMIT).cloned().collect(),
            watermark: Some(newest.published),
        },
        Some(mark) => {
            let fresh: Vec<FeedItem> = items
                .iter()
                .filter(|item| item.published > mark)
                .cloned()
                .collect();

            if fresh.is_empty() {
                return Selection::default();
            }

            if fresh.len() > dispatch_cap {
                let kept: Vec<FeedItem> = fresh[fresh.len() - dispatch_cap..].to_vec();
                let candidate = kept[0].published;
                return Selection {
                    items: kept,
                    watermark: Some(candidate),
                };
            }

            Selection {
                items: fresh,
                // The true newest seen item, not merely the newest selected.
                watermark: Some(newest.published),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const CAP: usize = 10;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 8, 0, 0).unwrap()
    }

    fn item(day: u32) -> FeedItem {
        FeedItem {
            title: format!("Post {}", day),
            description: String::new(),
            link: format!("https://example.com/{}", day),
            published: ts(day),
            author: "Author".to_string(),
            source: "Example".to_string(),
        }
    }

    /// Items for the given days, sorted newest first.
    fn items_desc(days: &[u32]) -> Vec<FeedItem> {
        let mut sorted: Vec<u32> = days.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.into_iter().map(item).collect()
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        let selection = select_new(&[], None, CAP);
        assert!(selection.items.is_empty());
        assert_eq!(selection.watermark, None);

        let selection = select_new(&[], Some(ts(1)), CAP);
        assert!(selection.items.is_empty());
        assert_eq!(selection.watermark, None);
    }

    #[test]
    fn test_first_run_selects_newest_five() {
        let items = items_desc(&[1, 2, 3, 4, 5, 6, 7]);
        let selection = select_new(&items, None, CAP);

        assert_eq!(selection.items.len(), 5);
        let days: Vec<_> = selection.items.iter().map(|i| i.published).collect();
        assert_eq!(days, vec![ts(7), ts(6), ts(5), ts(4), ts(3)]);
        // Candidate is the newest item in the full list
        assert_eq!(selection.watermark, Some(ts(7)));
    }

    #[test]
    fn test_first_run_small_backlog_selects_all() {
        let items = items_desc(&[1, 2, 3]);
        let selection = select_new(&items, None, CAP);

        assert_eq!(selection.items.len(), 3);
        assert_eq!(selection.watermark, Some(ts(3)));
    }

    #[test]
    fn test_steady_state_selects_strictly_newer() {
        let items = items_desc(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let selection = select_new(&items, Some(ts(7)), CAP);

        let days: Vec<_> = selection.items.iter().map(|i| i.published).collect();
        assert_eq!(days, vec![ts(9), ts(8)]);
        assert_eq!(selection.watermark, Some(ts(9)));
    }

    #[test]
    fn test_item_at_watermark_is_not_reselected() {
        let items = items_desc(&[5, 6, 7]);
        let selection = select_new(&items, Some(ts(7)), CAP);

        assert!(selection.items.is_empty());
        assert_eq!(selection.watermark, None);
    }

    #[test]
    fn test_replay_yields_same_selection() {
        let items = items_desc(&[1, 2, 3, 4, 5]);
        let first = select_new(&items, Some(ts(2)), CAP);
        let second = select_new(&items, Some(ts(2)), CAP);

        let days = |s: &Selection| s.items.iter().map(|i| i.published).collect::<Vec<_>>();
        assert_eq!(days(&first), days(&second));
        assert_eq!(first.watermark, second.watermark);
    }

    #[test]
    fn test_steady_state_no_count_cap_below_dispatch_cap() {
        // 8 new items with a cap of 10: all selected
        let items = items_desc(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let selection = select_new(&items, Some(ts(1)), CAP);
        assert_eq!(selection.items.len(), 8);
        assert_eq!(selection.watermark, Some(ts(9)));
    }

    #[test]
    fn test_overflow_keeps_oldest_and_limits_watermark() {
        // 12 new items, cap 10: the 10 oldest go out, the watermark stops at
        // the newest dispatched item so days 13-14 are selected next cycle.
        let days: Vec<u32> = (3..=14).collect();
        let items = items_desc(&days);
        let selection = select_new(&items, Some(ts(2)), CAP);

        assert_eq!(selection.items.len(), 10);
        let got: Vec<_> = selection.items.iter().map(|i| i.published).collect();
        let want: Vec<_> = (3..=12).rev().map(ts).collect();
        assert_eq!(got, want);
        assert_eq!(selection.watermark, Some(ts(12)));

        // Next cycle from the advanced watermark picks up the remainder
        let next = select_new(&items, selection.watermark, CAP);
        let got: Vec<_> = next.items.iter().map(|i| i.published).collect();
        assert_eq!(got, vec![ts(14), ts(13)]);
        assert_eq!(next.watermark, Some(ts(14)));
    }

    #[test]
    fn test_ties_keep_feed_order() {
        // Two items published at the same instant: original order preserved
        let mut items = vec![item(5), item(5), item(4)];
        items[0].title = "first".to_string();
        items[1].title = "second".to_string();

        let selection = select_new(&items, Some(ts(3)), CAP);
        assert_eq!(selection.items[0].title, "first");
        assert_eq!(selection.items[1].title, "second");
    }
}
