//! Shared domain types.
//!
//! These types flow through every stage of an ingestion run:
//!
//! - run configuration (`IngestConfig`, `FetchPolicy`, `MergeConfig`)
//! - zones and their ordered alternate codes (`Zone`)
//! - canonical per-hour records (`CanonicalRecord`) and fact-table rows (`FactRow`)

use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::window::QueryWindow;

/// Local timestamp layout used in every persisted file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A bidding zone with its ordered alternate codes.
///
/// Codes are tried in order; the first code producing records wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub codes: Vec<String>,
}

impl Zone {
    pub fn new<S: Into<String>>(name: impl Into<String>, codes: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a record measures.
///
/// `LoadForecast` is only ever written to its own feed file; the fact table
/// holds the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MeasurementType {
    ActualLoad,
    LoadForecast,
    GenerationForecast,
    EnergyPrice,
}

impl MeasurementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementType::ActualLoad => "actual_load",
            MeasurementType::LoadForecast => "load_forecast",
            MeasurementType::GenerationForecast => "generation_forecast",
            MeasurementType::EnergyPrice => "energy_price",
        }
    }
}

/// Whether a labelled record lies on or before the run date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Real,
    Forecast,
}

impl Horizon {
    pub fn as_str(self) -> &'static str {
        match self {
            Horizon::Real => "real",
            Horizon::Forecast => "forecast",
        }
    }
}

/// One hour of one measurement for one country.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// Local wall-clock time (UTC shifted by the run's fixed offset).
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u8,
    pub country: String,
    pub measurement_type: MeasurementType,
    pub unit: &'static str,
    /// Set only by feeds that label instead of dropping future hours.
    pub horizon: Option<Horizon>,
}

impl CanonicalRecord {
    /// Value of the `data_type` column in per-feed files.
    pub fn data_type(&self) -> &'static str {
        match self.horizon {
            Some(h) => h.as_str(),
            None => self.measurement_type.as_str(),
        }
    }
}

/// A canonical record plus calendar fields derived from its timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub timestamp: NaiveDateTime,
    pub country: String,
    pub day_of_week: u8,
    pub measurement_type: MeasurementType,
    pub measurement: f64,
    pub measurement_unit: &'static str,
    pub hour: u32,
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

/// The merged, sorted output of a merge run.
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    pub rows: Vec<FactRow>,
}

impl FactTable {
    /// Local dates of the earliest and latest rows.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.iter().map(|r| r.timestamp).min()?;
        let last = self.rows.iter().map(|r| r.timestamp).max()?;
        Some((first.date(), last.date()))
    }
}

/// Retry and timeout settings for market-data requests.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Total attempts per code, including the first.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Everything a fetch run needs, resolved up front.
///
/// Derived from CLI flags (plus defaults); nothing downstream reads globals.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub window: QueryWindow,
    /// Whole-hour offset from UTC to local time.
    pub offset_hours: i32,
    /// Zones in name order.
    pub zones: Vec<Zone>,
    pub fetch: FetchPolicy,
    pub base_url: String,
    pub data_dir: PathBuf,
    /// Countries resolved concurrently (1 = sequential).
    pub workers: usize,
    /// Local wall-clock cutoff for future hours.
    pub now: NaiveDateTime,
}

/// Which end of the sorted file list a reader takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pick {
    Earliest,
    Latest,
}

#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub data_dir: PathBuf,
    pub pick: Pick,
    /// Used to name the output when the fact table is empty.
    pub run_date: NaiveDate,
}
