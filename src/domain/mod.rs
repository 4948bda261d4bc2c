//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`IngestConfig`, `MergeConfig`, `FetchPolicy`)
//! - the feed catalogue (`FeedDescriptor`, `FeedKind`)
//! - canonical records and fact-table rows
//! - the built-in zone table

pub mod feed;
pub mod types;
pub mod zones;

pub use feed::*;
pub use types::*;
pub use zones::*;
