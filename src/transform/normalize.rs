//! UTC points to canonical local-time records.

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::domain::{CanonicalRecord, FeedDescriptor, FuturePolicy, Horizon};
use crate::io::xml::UtcPoint;

/// Shift `points` to local time and tag them for `country`.
///
/// Hours after `now` are dropped or labelled according to the feed's
/// [`FuturePolicy`]. The offset is a fixed whole-hour constant; no DST logic.
pub fn normalize(
    points: &[UtcPoint],
    feed: &FeedDescriptor,
    country: &str,
    offset_hours: i32,
    now: NaiveDateTime,
) -> Vec<CanonicalRecord> {
    let offset = Duration::hours(i64::from(offset_hours));
    let mut out = Vec::with_capacity(points.len());

    for p in points {
        let Some(timestamp) = p.instant.checked_add_signed(offset) else {
            tracing::warn!(country, instant = %p.instant, offset_hours, "local time out of range; point skipped");
            continue;
        };
        let horizon = match feed.future {
            FuturePolicy::Drop if timestamp > now => continue,
            FuturePolicy::Drop => None,
            // Labelled by calendar date, not by hour.
            FuturePolicy::Label if timestamp.date() <= now.date() => Some(Horizon::Real),
            FuturePolicy::Label => Some(Horizon::Forecast),
        };

        out.push(CanonicalRecord {
            timestamp,
            value: p.value,
            day_of_week: day_of_week(timestamp),
            country: country.to_string(),
            measurement_type: feed.measurement_type,
            unit: feed.unit,
            horizon,
        });
    }

    out
}

/// Monday = 0 … Sunday = 6.
pub fn day_of_week(ts: NaiveDateTime) -> u8 {
    ts.weekday().num_days_from_monday() as u8
}
