//! Text utilities shared across the fetch and notification layers.
//!
//! - **Sanitization**: markup stripping and entity decoding for feed text
//! - **Truncation**: character-budget truncation with an ellipsis marker

mod text;

pub use text::{sanitize, truncate_chars};
