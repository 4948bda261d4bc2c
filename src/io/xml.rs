//! Market-document XML to hourly UTC points.
//!
//! Expected shape (namespace varies per feed):
//!
//! ```text
//! <GL_MarketDocument | Publication_MarketDocument>
//!   <TimeSeries>
//!     <Period>
//!       <timeInterval><start>2025-02-03T23:00Z</start>...</timeInterval>
//!       <resolution>PT60M</resolution>
//!       <Point><position>1</position><quantity>...</quantity></Point>
//! ```
//!
//! Only `PT60M` periods are read. Bad points and periods are skipped and
//! counted, never fatal; only a document that is not XML at all is an error.

use chrono::{Duration, NaiveDateTime};
use roxmltree::{Document, Node};

const HOURLY: &str = "PT60M";
const ACKNOWLEDGEMENT: &str = "Acknowledgement_MarketDocument";
const START_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"];

/// One value at an absolute UTC hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcPoint {
    pub instant: NaiveDateTime,
    pub value: f64,
}

/// Position and value as read from a `Point`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawPoint {
    position: u32,
    value: f64,
}

/// Parser output plus what was skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct ParsedSeries {
    pub points: Vec<UtcPoint>,
    pub series_seen: usize,
    pub series_skipped: usize,
    pub periods_skipped: usize,
    pub points_skipped: usize,
    /// Reason text when the service answered with an acknowledgement (no data).
    pub acknowledgement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesError(pub String);

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed market document: {}", self.0)
    }
}

/// Absolute UTC hour of a 1-based `position` within a period starting at `start`.
///
/// `None` when the hour falls outside the representable date range.
pub fn position_instant(start: NaiveDateTime, position: u32) -> Option<NaiveDateTime> {
    start.checked_add_signed(Duration::hours(i64::from(position) - 1))
}

/// Extract hourly `(instant, value)` pairs from one feed payload.
///
/// `value_field` is the `Point` child holding the number (`quantity`,
/// `price.amount`). Output order follows the document, which is not sorted.
pub fn parse_series(xml: &str, namespace: &str, value_field: &str) -> Result<ParsedSeries, SeriesError> {
    let doc = Document::parse(xml).map_err(|e| SeriesError(e.to_string()))?;
    let root = doc.root_element();
    let mut out = ParsedSeries::default();

    if root.tag_name().name() == ACKNOWLEDGEMENT {
        let reason = root
            .descendants()
            .find(|n| n.tag_name().name() == "text")
            .and_then(|n| n.text())
            .unwrap_or("no reason given")
            .trim()
            .to_string();
        out.acknowledgement = Some(reason);
        return Ok(out);
    }

    for series in root.descendants().filter(|n| n.has_tag_name((namespace, "TimeSeries"))) {
        out.series_seen += 1;

        let periods: Vec<Node> = series
            .descendants()
            .filter(|n| n.has_tag_name((namespace, "Period")))
            .collect();
        if periods.is_empty() {
            out.series_skipped += 1;
            continue;
        }

        for period in periods {
            let Some(start) = period_start(period, namespace) else {
                out.periods_skipped += 1;
                continue;
            };
            if find(period, namespace, "resolution").and_then(|n| n.text()).map(str::trim) != Some(HOURLY) {
                out.periods_skipped += 1;
                continue;
            }

            for point in period.descendants().filter(|n| n.has_tag_name((namespace, "Point"))) {
                let parsed = read_point(point, namespace, value_field)
                    .and_then(|raw| Some((position_instant(start, raw.position)?, raw.value)));
                match parsed {
                    Some((instant, value)) => out.points.push(UtcPoint { instant, value }),
                    None => out.points_skipped += 1,
                }
            }
        }
    }

    Ok(out)
}

fn period_start(period: Node, namespace: &str) -> Option<NaiveDateTime> {
    let text = find(period, namespace, "timeInterval")
        .and_then(|interval| find(interval, namespace, "start"))
        .and_then(|n| n.text())?
        .trim();
    START_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn read_point(point: Node, namespace: &str, value_field: &str) -> Option<RawPoint> {
    let position = find(point, namespace, "position")?.text()?.trim().parse::<u32>().ok()?;
    if position == 0 {
        return None;
    }
    let value = find(point, namespace, value_field)?.text()?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(RawPoint { position, value })
}

/// First descendant (excluding `node` itself) with the given name.
fn find<'a, 'input>(node: Node<'a, 'input>, namespace: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|n| n.has_tag_name((namespace, name)))
}
