//! feedwatch: incremental RSS-to-webhook delivery.
//!
//! Polls a configured set of RSS/Atom feeds, selects the items published
//! since each feed's last successful delivery, optionally summarizes them,
//! and posts one Discord-style webhook message per feed. The only durable
//! state is one watermark timestamp per feed, advanced strictly after a
//! confirmed send so nothing is lost to a failed dispatch.

pub mod config;
pub mod delta;
pub mod feed;
pub mod notify;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod util;
