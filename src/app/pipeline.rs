//! Shared feed and merge workflows used by every subcommand.
//!
//! One engine serves all feeds:
//! zones -> code fallback (fetch -> parse -> normalize) -> dedup -> feed file
//!
//! and the merge stage:
//! latest feed files -> parse rows -> stack + sort -> fact table file

use std::path::PathBuf;

use crate::data::{MarketSource, ResolveContext, ZoneOutcome, resolve_zones};
use crate::domain::{FeedDescriptor, FeedKind, IngestConfig, MergeConfig};
use crate::error::AppError;
use crate::io::store;
use crate::transform::{FeedInput, MergeOutput, dedup, merge_feeds};

/// Outcome of one feed run.
#[derive(Debug, Clone)]
pub struct FeedRun {
    pub feed: &'static FeedDescriptor,
    /// One entry per zone, in name order.
    pub outcomes: Vec<ZoneOutcome>,
    pub records_written: usize,
    /// `None` when no zone produced data and nothing was written.
    pub path: Option<PathBuf>,
}

impl FeedRun {
    pub fn available(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_available()).count()
    }

    pub fn unavailable(&self) -> usize {
        self.outcomes.len() - self.available()
    }
}

/// Run one feed across all configured zones and persist its file.
pub fn run_feed<S>(source: &S, feed: &'static FeedDescriptor, config: &IngestConfig) -> Result<FeedRun, AppError>
where
    S: MarketSource + ?Sized,
{
    let span = tracing::info_span!("feed", feed = feed.label);
    let _enter = span.enter();

    let ctx = ResolveContext {
        feed,
        window: &config.window,
        offset_hours: config.offset_hours,
        now: config.now,
    };
    let outcomes = resolve_zones(source, &config.zones, &ctx, config.workers)?;

    let collected = outcomes.iter().flat_map(|o| o.records().iter().cloned()).collect();
    let mut records = dedup(collected, feed.dedup);
    records.sort_by(|a, b| a.country.cmp(&b.country).then_with(|| a.timestamp.cmp(&b.timestamp)));

    if records.is_empty() {
        tracing::error!(zones = outcomes.len(), "no data for any zone; nothing written");
        return Ok(FeedRun {
            feed,
            outcomes,
            records_written: 0,
            path: None,
        });
    }

    let path = store::feed_path(&config.data_dir, feed, &config.window);
    store::write_feed_file(&path, feed, &records)?;

    Ok(FeedRun {
        feed,
        outcomes,
        records_written: records.len(),
        path: Some(path),
    })
}

/// What the merge stage read and wrote.
#[derive(Debug, Clone)]
pub struct MergeRun {
    /// (feed label, file read, rows read) in append order.
    pub inputs: Vec<(&'static str, PathBuf, usize)>,
    pub output: MergeOutput,
    pub path: PathBuf,
}

/// Locate each merged feed's file, build the fact table, and persist it.
///
/// Every input is located before anything is read, so a missing feed fails
/// the run without touching the output directory.
pub fn run_merge(config: &MergeConfig) -> Result<MergeRun, AppError> {
    let mut located = Vec::with_capacity(FeedKind::MERGED.len());
    for kind in FeedKind::MERGED {
        let feed = kind.descriptor();
        let path = store::locate_input(&config.data_dir.join(feed.dir), config.pick)?;
        tracing::info!(feed = feed.label, path = %path.display(), "found input");
        located.push((feed, path));
    }

    let mut feeds = Vec::with_capacity(located.len());
    let mut inputs = Vec::with_capacity(located.len());
    for (feed, path) in located {
        let rows = store::read_feed_file(&path, feed)?;
        inputs.push((feed.label, path, rows.len()));
        feeds.push(FeedInput { feed, rows });
    }

    let output = merge_feeds(&feeds);
    let path = store::fact_table_path(&config.data_dir, &output.table, config.run_date);
    store::write_fact_table(&path, &output.table)?;

    Ok(MergeRun { inputs, output, path })
}
