//! Per-zone fallback across alternate codes.
//!
//! Codes of one zone are tried strictly in order and the first code that
//! yields records wins. Zones are independent, so several can be resolved
//! at once on a bounded pool; results always come back in zone-name order.

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::data::entsoe::{FeedRequest, FetchError, MarketSource};
use crate::data::window::QueryWindow;
use crate::domain::{CanonicalRecord, FeedDescriptor, Zone};
use crate::error::AppError;
use crate::io::xml::{SeriesError, parse_series};
use crate::transform::normalize;

/// Inputs shared by every zone of one feed run.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub feed: &'a FeedDescriptor,
    pub window: &'a QueryWindow,
    pub offset_hours: i32,
    pub now: NaiveDateTime,
}

/// Why one code was passed over.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    Fetch(FetchError),
    Parse(SeriesError),
    /// The document parsed but held no usable hourly records.
    Empty { acknowledgement: Option<String> },
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Fetch(e) => write!(f, "{e}"),
            AttemptFailure::Parse(e) => write!(f, "{e}"),
            AttemptFailure::Empty { acknowledgement: Some(reason) } => write!(f, "no data ({reason})"),
            AttemptFailure::Empty { acknowledgement: None } => write!(f, "no usable hourly records"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttempt {
    pub code: String,
    pub failure: AttemptFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneOutcome {
    Available {
        zone: String,
        code: String,
        records: Vec<CanonicalRecord>,
        /// Earlier codes that were passed over.
        skipped: Vec<CodeAttempt>,
    },
    Unavailable {
        zone: String,
        attempts: Vec<CodeAttempt>,
    },
}

impl ZoneOutcome {
    pub fn zone(&self) -> &str {
        match self {
            ZoneOutcome::Available { zone, .. } | ZoneOutcome::Unavailable { zone, .. } => zone,
        }
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        match self {
            ZoneOutcome::Available { records, .. } => records,
            ZoneOutcome::Unavailable { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ZoneOutcome::Available { .. })
    }
}

/// Try `zone.codes` in order; stop at the first code producing records.
pub fn resolve_zone<S>(source: &S, zone: &Zone, ctx: &ResolveContext) -> ZoneOutcome
where
    S: MarketSource + ?Sized,
{
    let mut attempts = Vec::new();

    for code in &zone.codes {
        tracing::info!(zone = %zone.name, code = %code, feed = ctx.feed.label, "fetching");
        match try_code(source, &zone.name, code, ctx) {
            Ok(records) => {
                tracing::info!(zone = %zone.name, code = %code, records = records.len(), "zone resolved");
                return ZoneOutcome::Available {
                    zone: zone.name.clone(),
                    code: code.clone(),
                    records,
                    skipped: attempts,
                };
            }
            Err(failure) => {
                tracing::warn!(zone = %zone.name, code = %code, "code passed over: {failure}");
                attempts.push(CodeAttempt {
                    code: code.clone(),
                    failure,
                });
            }
        }
    }

    tracing::warn!(zone = %zone.name, feed = ctx.feed.label, "no data for any code");
    ZoneOutcome::Unavailable {
        zone: zone.name.clone(),
        attempts,
    }
}

/// Resolve every zone, `workers` at a time, returning outcomes in name order.
pub fn resolve_zones<S>(
    source: &S,
    zones: &[Zone],
    ctx: &ResolveContext,
    workers: usize,
) -> Result<Vec<ZoneOutcome>, AppError>
where
    S: MarketSource + ?Sized,
{
    let mut ordered: Vec<&Zone> = zones.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    if workers <= 1 {
        return Ok(ordered.into_iter().map(|z| resolve_zone(source, z, ctx)).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("resolver-{i}"))
        .build()
        .map_err(|e| AppError::config(format!("Failed to start {workers} resolver workers: {e}")))?;

    // Indexed parallel collect keeps input order regardless of completion order.
    Ok(pool.install(|| ordered.par_iter().map(|z| resolve_zone(source, z, ctx)).collect()))
}

fn try_code<S>(source: &S, zone: &str, code: &str, ctx: &ResolveContext) -> Result<Vec<CanonicalRecord>, AttemptFailure>
where
    S: MarketSource + ?Sized,
{
    let request = FeedRequest::new(ctx.feed, code, ctx.window);
    let body = source.fetch(&request).map_err(AttemptFailure::Fetch)?;

    let parsed = parse_series(&body, ctx.feed.namespace, ctx.feed.value_field).map_err(AttemptFailure::Parse)?;
    if parsed.series_skipped + parsed.periods_skipped + parsed.points_skipped > 0 {
        tracing::debug!(
            zone,
            code,
            series = parsed.series_seen,
            series_skipped = parsed.series_skipped,
            periods_skipped = parsed.periods_skipped,
            points_skipped = parsed.points_skipped,
            "skipped parts of the document"
        );
    }

    let records = normalize(&parsed.points, ctx.feed, zone, ctx.offset_hours, ctx.now);
    if records.is_empty() {
        return Err(AttemptFailure::Empty {
            acknowledgement: parsed.acknowledgement,
        });
    }
    Ok(records)
}
