//! Run summaries printed to stdout.

pub mod format;

pub use format::{format_feed_summary, format_merge_summary, format_zones};
