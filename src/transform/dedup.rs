//! Collapse records that share (timestamp, country, measurement type).

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDateTime;

use crate::domain::{CanonicalRecord, DedupPolicy, MeasurementType};

type Key = (NaiveDateTime, String, MeasurementType);

/// Apply `policy` to every group of colliding records.
///
/// Output is ordered by (timestamp, country). Running this on its own output
/// returns it unchanged.
pub fn dedup(records: Vec<CanonicalRecord>, policy: DedupPolicy) -> Vec<CanonicalRecord> {
    let mut groups: BTreeMap<Key, CanonicalRecord> = BTreeMap::new();
    let mut collisions = 0usize;

    for record in records {
        let key = (record.timestamp, record.country.clone(), record.measurement_type);
        match groups.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                collisions += 1;
                if policy == DedupPolicy::Max {
                    let kept = slot.get_mut();
                    kept.value = kept.value.max(record.value);
                }
            }
        }
    }

    if collisions > 0 {
        tracing::debug!(collisions, ?policy, "collapsed duplicate records");
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(country: &str, hour: u32, value: f64, day_of_week: u8) -> CanonicalRecord {
        CanonicalRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(hour, 0, 0).unwrap(),
            value,
            day_of_week,
            country: country.to_string(),
            measurement_type: MeasurementType::GenerationForecast,
            unit: "MW",
            horizon: None,
        }
    }

    #[test]
    fn max_policy_keeps_largest_value_and_first_day_of_week() {
        let out = dedup(
            vec![record("Austria", 0, 50.0, 1), record("Austria", 0, 70.0, 6)],
            DedupPolicy::Max,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 70.0);
        assert_eq!(out[0].day_of_week, 1);
    }

    #[test]
    fn keep_first_policy_keeps_first_seen() {
        let out = dedup(
            vec![record("Austria", 0, 50.0, 1), record("Austria", 0, 70.0, 1)],
            DedupPolicy::KeepFirst,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 50.0);
    }

    #[test]
    fn distinct_keys_survive_in_timestamp_then_country_order() {
        let out = dedup(
            vec![record("Belgium", 1, 1.0, 1), record("Austria", 1, 2.0, 1), record("Belgium", 0, 3.0, 1)],
            DedupPolicy::Max,
        );
        let order: Vec<(u32, &str)> = out
            .iter()
            .map(|r| (chrono::Timelike::hour(&r.timestamp), r.country.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "Belgium"), (1, "Austria"), (1, "Belgium")]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = vec![
            record("Austria", 0, 50.0, 1),
            record("Austria", 0, 70.0, 1),
            record("Austria", 1, 10.0, 1),
            record("Belgium", 0, 5.0, 1),
            record("Belgium", 0, 5.0, 1),
        ];
        for policy in [DedupPolicy::Max, DedupPolicy::KeepFirst] {
            let once = dedup(input.clone(), policy);
            let twice = dedup(once.clone(), policy);
            assert_eq!(once, twice);
            assert_eq!(once.len(), 3);
        }
    }
}
