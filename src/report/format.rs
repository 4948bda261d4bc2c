//! Formatted terminal output for feed, merge, and zone listings.
//!
//! Summaries make partial success visible: every zone is listed as resolved
//! (with the winning code) or unavailable (with why each code was passed over).

use crate::app::pipeline::{FeedRun, MergeRun};
use crate::data::{QueryWindow, ZoneOutcome};
use crate::domain::Zone;

/// Format one feed run.
pub fn format_feed_summary(run: &FeedRun, window: &QueryWindow) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== ef - {} ===\n", run.feed.label));
    out.push_str(&format!(
        "Window: {} .. {} local | UTC {} .. {}\n",
        window.start_date,
        window.end_date,
        window.period_start(),
        window.period_end()
    ));
    out.push_str(&format!(
        "Zones: {} resolved, {} unavailable | records written: {}\n",
        run.available(),
        run.unavailable(),
        run.records_written
    ));

    out.push('\n');
    for outcome in &run.outcomes {
        match outcome {
            ZoneOutcome::Available { zone, code, records, skipped } => {
                out.push_str(&format!("  {:<24} ok    {:<18} {:>6} records\n", zone, code, records.len()));
                for attempt in skipped {
                    out.push_str(&format!("  {:<24}   skipped {}: {}\n", "", attempt.code, attempt.failure));
                }
            }
            ZoneOutcome::Unavailable { zone, attempts } => {
                out.push_str(&format!("  {:<24} unavailable\n", zone));
                for attempt in attempts {
                    out.push_str(&format!("  {:<24}   {}: {}\n", "", attempt.code, attempt.failure));
                }
            }
        }
    }

    out.push('\n');
    match &run.path {
        Some(path) => out.push_str(&format!("Saved: {}\n", path.display())),
        None => out.push_str("Saved: nothing (no data for any zone)\n"),
    }
    out
}

/// Format the merge stage.
pub fn format_merge_summary(run: &MergeRun) -> String {
    let mut out = String::new();

    out.push_str("=== ef - Merge ===\n");
    for (label, path, rows) in &run.inputs {
        let dropped = run
            .output
            .dropped
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        out.push_str(&format!(
            "  {:<30} {:>7} rows ({} dropped)  {}\n",
            label,
            rows,
            dropped,
            path.display()
        ));
    }

    let table = &run.output.table;
    match table.date_span() {
        Some((first, last)) => out.push_str(&format!(
            "Fact table: {} rows | {} .. {}\n",
            table.rows.len(),
            first,
            last
        )),
        None => out.push_str("Fact table: 0 rows\n"),
    }
    out.push_str(&format!("Saved: {}\n", run.path.display()));
    out
}

/// Format a zone table, one zone per line with codes in fallback order.
pub fn format_zones(zones: &[Zone]) -> String {
    let mut out = String::new();
    for zone in zones {
        out.push_str(&format!("{:<24} {}\n", zone.name, zone.codes.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::{AttemptFailure, CodeAttempt, FetchError};
    use crate::domain::ACTUAL_LOAD;

    #[test]
    fn feed_summary_separates_resolved_and_unavailable_zones() {
        let run = FeedRun {
            feed: &ACTUAL_LOAD,
            outcomes: vec![
                ZoneOutcome::Unavailable {
                    zone: "Albania".to_string(),
                    attempts: vec![CodeAttempt {
                        code: "10YAL-KESH-----5".to_string(),
                        failure: AttemptFailure::Fetch(FetchError::Status {
                            status: 400,
                            body: "No matching data".to_string(),
                        }),
                    }],
                },
                ZoneOutcome::Available {
                    zone: "Austria".to_string(),
                    code: "10YAT-APG------L".to_string(),
                    records: Vec::new(),
                    skipped: Vec::new(),
                },
            ],
            records_written: 24,
            path: Some(PathBuf::from("data/load/x.csv.gz")),
        };
        let window = QueryWindow::parse("2024-01-02", 1, 1).unwrap();
        let text = format_feed_summary(&run, &window);

        assert!(text.contains("=== ef - Actual Total Load ==="));
        assert!(text.contains("Zones: 1 resolved, 1 unavailable | records written: 24"));
        assert!(text.contains("Albania"));
        assert!(text.contains("unavailable"));
        assert!(text.contains("10YAL-KESH-----5: HTTP 400: No matching data"));
        assert!(text.contains("Saved: data/load/x.csv.gz"));
    }

    #[test]
    fn zones_are_listed_with_codes_in_order() {
        let text = format_zones(&[Zone::new("Denmark", ["A", "B"])]);
        assert!(text.starts_with("Denmark"));
        assert!(text.trim_end().ends_with("A, B"));
    }
}
