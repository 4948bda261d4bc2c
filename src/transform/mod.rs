//! Record-level transforms: normalization, deduplication, and feed merging.

pub mod dedup;
pub mod merge;
pub mod normalize;

pub use dedup::dedup;
pub use merge::{FeedInput, MergeOutput, fact_row, merge_feeds};
pub use normalize::{day_of_week, normalize};
