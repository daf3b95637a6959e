//! Outbound notification: webhook dispatch and optional AI summarization.
//!
//! The dispatcher renders one message per feed (header line plus up to ten
//! item embeds) and reports plain success/failure; it never raises past the
//! caller, because the caller decides whether the watermark may advance.
//! Summarization is best-effort enrichment: any failure falls back to the
//! item's sanitized description.

mod summarize;
mod webhook;

pub use summarize::{OpenAiSummarizer, Summarizer, SYNOPSIS_LIMIT};
pub use webhook::{Dispatcher, DispatchOutcome, MAX_EMBEDS_PER_MESSAGE};
