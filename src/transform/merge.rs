//! Stack the load, generation and price feeds into one fact table.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::domain::{CanonicalRecord, FactRow, FactTable, FeedDescriptor, TIMESTAMP_FORMAT};
use crate::io::store::StoredRow;
use crate::transform::dedup::dedup;
use crate::transform::normalize::day_of_week;

/// Timestamp layouts accepted when reading feed files back.
const READ_FORMATS: [&str; 3] = [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// One feed's stored rows, tagged with the descriptor that names them.
#[derive(Debug, Clone)]
pub struct FeedInput {
    pub feed: &'static FeedDescriptor,
    pub rows: Vec<StoredRow>,
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub table: FactTable,
    /// Rows per feed label that did not parse and were left out.
    pub dropped: Vec<(&'static str, usize)>,
}

/// Build the fact table from feeds given in append order.
///
/// Rows with an unparseable timestamp or value are dropped with a warning.
/// Sorted by (timestamp, country); ties keep feed order.
pub fn merge_feeds(feeds: &[FeedInput]) -> MergeOutput {
    let mut rows = Vec::new();
    let mut dropped = Vec::with_capacity(feeds.len());

    for input in feeds {
        let feed = input.feed;
        let mut records = Vec::with_capacity(input.rows.len());
        let mut bad = 0usize;

        for row in &input.rows {
            match parse_row(row, feed) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    bad += 1;
                    tracing::warn!(feed = feed.label, line = row.line, country = %row.country, "dropping row: {reason}");
                }
            }
        }

        rows.extend(dedup(records, feed.dedup).iter().map(fact_row));
        dropped.push((feed.label, bad));
    }

    rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.country.cmp(&b.country)));
    MergeOutput {
        table: FactTable { rows },
        dropped,
    }
}

/// Add calendar fields to a canonical record.
pub fn fact_row(record: &CanonicalRecord) -> FactRow {
    let ts = record.timestamp;
    FactRow {
        timestamp: ts,
        country: record.country.clone(),
        day_of_week: record.day_of_week,
        measurement_type: record.measurement_type,
        measurement: record.value,
        measurement_unit: record.unit,
        hour: ts.hour(),
        day: ts.day(),
        month: ts.month(),
        year: ts.year(),
    }
}

fn parse_row(row: &StoredRow, feed: &FeedDescriptor) -> Result<CanonicalRecord, String> {
    let timestamp = READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&row.timestamp, fmt).ok())
        .ok_or_else(|| format!("invalid timestamp '{}'", row.timestamp))?;
    let value = row
        .value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid value '{}'", row.value))?;
    if row.country.is_empty() {
        return Err("missing country".to_string());
    }

    Ok(CanonicalRecord {
        timestamp,
        value,
        day_of_week: day_of_week(timestamp),
        country: row.country.clone(),
        measurement_type: feed.measurement_type,
        unit: feed.unit,
        horizon: None,
    })
}
