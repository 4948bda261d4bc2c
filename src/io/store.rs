//! Gzip-compressed CSV persistence for feed files and the fact table.
//!
//! Files are replaced wholesale: an existing file at the target path is
//! removed before the new one is written. Readers find "the" input of a
//! directory by sorting `*.csv.gz` names and taking one end.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::data::window::QueryWindow;
use crate::domain::{CanonicalRecord, FactTable, FeedDescriptor, Pick, TIMESTAMP_FORMAT};
use crate::error::AppError;

const FILE_SUFFIX: &str = ".csv.gz";
const MERGED_DIR: &str = "merged_data";

pub const FACT_COLUMNS: [&str; 10] = [
    "timestamp",
    "country",
    "day_of_week",
    "measurement_type",
    "measurement",
    "measurement_unit",
    "hour",
    "day",
    "month",
    "year",
];

/// One row of a feed file, as text. Parsing is left to the merger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// 1-based line number in the decompressed CSV.
    pub line: usize,
    pub timestamp: String,
    pub value: String,
    pub country: String,
}

impl StoredRow {
    pub fn from_record(line: usize, record: &CanonicalRecord) -> Self {
        Self {
            line,
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            value: record.value.to_string(),
            country: record.country.clone(),
        }
    }
}

/// `<data>/<feed dir>/<stem>_<start>_to_<end>.csv.gz`
pub fn feed_path(data_dir: &Path, feed: &FeedDescriptor, window: &QueryWindow) -> PathBuf {
    data_dir
        .join(feed.dir)
        .join(format!("{}_{}{FILE_SUFFIX}", feed.file_stem, window.file_tag()))
}

/// `<data>/merged_data/merged_dataset_<first>_to_<last>.csv.gz`, named after
/// `run_date` when the table is empty.
pub fn fact_table_path(data_dir: &Path, table: &FactTable, run_date: NaiveDate) -> PathBuf {
    let (first, last) = table.date_span().unwrap_or((run_date, run_date));
    data_dir.join(MERGED_DIR).join(format!(
        "merged_dataset_{}_to_{}{FILE_SUFFIX}",
        first.format("%Y%m%d"),
        last.format("%Y%m%d")
    ))
}

/// Write one feed's records. Columns:
/// `timestamp, <value column>, day_of_week, country, data_type`.
pub fn write_feed_file(path: &Path, feed: &FeedDescriptor, records: &[CanonicalRecord]) -> Result<(), AppError> {
    replace_csv_gz(path, |writer| {
        writer.write_record(["timestamp", feed.value_column, "day_of_week", "country", "data_type"])?;
        for r in records {
            writer.write_record([
                r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                r.value.to_string(),
                r.day_of_week.to_string(),
                r.country.clone(),
                r.data_type().to_string(),
            ])?;
        }
        Ok(())
    })
}

pub fn write_fact_table(path: &Path, table: &FactTable) -> Result<(), AppError> {
    replace_csv_gz(path, |writer| {
        writer.write_record(FACT_COLUMNS)?;
        for r in &table.rows {
            writer.write_record([
                r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                r.country.clone(),
                r.day_of_week.to_string(),
                r.measurement_type.as_str().to_string(),
                r.measurement.to_string(),
                r.measurement_unit.to_string(),
                r.hour.to_string(),
                r.day.to_string(),
                r.month.to_string(),
                r.year.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Read a feed file back by header name.
pub fn read_feed_file(path: &Path, feed: &FeedDescriptor) -> Result<Vec<StoredRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open feed file '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(MultiGzDecoder::new(BufReader::new(file)));

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read headers of '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);
    for column in ["timestamp", feed.value_column, "country"] {
        if !header_map.contains_key(column) {
            return Err(AppError::io(format!(
                "Feed file '{}' is missing column `{column}`.",
                path.display()
            )));
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based, after the header line.
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::io(format!("Failed to read line {line} of '{}': {e}", path.display()))
        })?;
        rows.push(StoredRow {
            line,
            timestamp: get_field(&record, &header_map, "timestamp"),
            value: get_field(&record, &header_map, feed.value_column),
            country: get_field(&record, &header_map, "country"),
        });
    }
    Ok(rows)
}

/// The first or last `*.csv.gz` in `dir` by file name.
///
/// A missing directory or one without matching files is a no-input failure;
/// a directory that exists but cannot be listed is a configuration failure.
pub fn locate_input(dir: &Path, pick: Pick) -> Result<PathBuf, AppError> {
    if !dir.exists() {
        return Err(AppError::no_input(format!("Input directory '{}' does not exist.", dir.display())));
    }
    fs::read_dir(dir)
        .map_err(|e| AppError::config(format!("Cannot read input directory '{}': {e}", dir.display())))?;

    let pattern = format!(
        "{}/*{FILE_SUFFIX}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| AppError::config(format!("Bad input pattern '{pattern}': {e}")))?;

    let mut files: Vec<PathBuf> = entries.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let picked = match pick {
        Pick::Earliest => files.first(),
        Pick::Latest => files.last(),
    };
    picked.cloned().ok_or_else(|| {
        AppError::no_input(format!("No {FILE_SUFFIX} file found in '{}'.", dir.display()))
    })
}

fn replace_csv_gz<F>(path: &Path, write_rows: F) -> Result<(), AppError>
where
    F: FnOnce(&mut csv::Writer<GzEncoder<File>>) -> csv::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| AppError::io(format!("Failed to remove old '{}': {e}", path.display())))?;
        tracing::info!(path = %path.display(), "removed existing file");
    }

    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    // GzEncoder::new writes no mtime, so identical rows give identical bytes.
    let mut writer = csv::Writer::from_writer(GzEncoder::new(file, Compression::default()));

    write_rows(&mut writer)
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    let encoder = writer
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to flush '{}': {}", path.display(), e.error())))?;
    let mut file = encoder
        .finish()
        .map_err(|e| AppError::io(format!("Failed to finish gzip '{}': {e}", path.display())))?;
    file.flush()
        .map_err(|e| AppError::io(format!("Failed to flush '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), "saved");
    Ok(())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), idx))
        .collect()
}

fn get_field(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> String {
    header_map
        .get(name)
        .and_then(|idx| record.get(*idx))
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{ENERGY_PRICE, FactRow, GENERATION_FORECAST, MeasurementType};

    fn record(country: &str, hour: u32, value: f64) -> CanonicalRecord {
        CanonicalRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(hour, 0, 0).unwrap(),
            value,
            day_of_week: 1,
            country: country.to_string(),
            measurement_type: MeasurementType::EnergyPrice,
            unit: "€/MWh",
            horizon: None,
        }
    }

    fn gunzip(path: &Path) -> String {
        let mut out = String::new();
        MultiGzDecoder::new(File::open(path).unwrap()).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn feed_file_uses_feed_columns_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("price").join("p.csv.gz");
        write_feed_file(&path, &ENERGY_PRICE, &[record("Austria", 0, 87.5), record("Austria", 1, 90.0)]).unwrap();

        let text = gunzip(&path);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,energy_price,day_of_week,country,data_type"));
        assert_eq!(lines.next(), Some("2024-01-02 00:00:00,87.5,1,Austria,energy_price"));

        let rows = read_feed_file(&path, &ENERGY_PRICE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], StoredRow::from_record(3, &record("Austria", 1, 90.0)));
    }

    #[test]
    fn reading_with_the_wrong_feed_reports_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv.gz");
        write_feed_file(&path, &ENERGY_PRICE, &[record("Austria", 0, 1.0)]).unwrap();

        let err = read_feed_file(&path, &GENERATION_FORECAST).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_IO);
    }

    #[test]
    fn rewrite_replaces_and_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv.gz");
        let table = FactTable {
            rows: vec![FactRow {
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(5, 0, 0).unwrap(),
                country: "Austria".to_string(),
                day_of_week: 1,
                measurement_type: MeasurementType::ActualLoad,
                measurement: 6123.0,
                measurement_unit: "MW",
                hour: 5,
                day: 2,
                month: 1,
                year: 2024,
            }],
        };

        fs::write(&path, b"stale").unwrap();
        write_fact_table(&path, &table).unwrap();
        let first = fs::read(&path).unwrap();
        write_fact_table(&path, &table).unwrap();
        assert_eq!(first, fs::read(&path).unwrap());

        let text = gunzip(&path);
        assert_eq!(
            text,
            "timestamp,country,day_of_week,measurement_type,measurement,measurement_unit,hour,day,month,year\n\
             2024-01-02 05:00:00,Austria,1,actual_load,6123,MW,5,2,1,2024\n"
        );
    }

    #[test]
    fn locate_picks_by_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_20240102.csv.gz", "a_20240103.csv.gz", "c_20240101.csv.gz", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let latest = locate_input(dir.path(), Pick::Latest).unwrap();
        let earliest = locate_input(dir.path(), Pick::Earliest).unwrap();
        assert_eq!(latest.file_name().unwrap(), "c_20240101.csv.gz");
        assert_eq!(earliest.file_name().unwrap(), "a_20240103.csv.gz");
    }

    #[test]
    fn locate_without_files_is_a_no_input_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_input(dir.path(), Pick::Latest).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_INPUT);

        let err = locate_input(&dir.path().join("missing"), Pick::Latest).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_INPUT);
    }

    #[test]
    fn fact_table_path_uses_covered_dates_or_run_date() {
        let run_date = NaiveDate::from_ymd_opt(2025, 2, 6).unwrap();
        let path = fact_table_path(Path::new("data"), &FactTable::default(), run_date);
        assert_eq!(path, Path::new("data/merged_data/merged_dataset_20250206_to_20250206.csv.gz"));
    }
}
