//! Durable watermark state.
//!
//! One row per feed: "the newest item already delivered". This is the only
//! persistent state in the system and the whole basis of delta selection.

mod db;
mod watermarks;

pub use db::Database;
pub use watermarks::watermark_key;
