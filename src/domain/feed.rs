//! Feed catalogue.
//!
//! Every feed runs through the same engine; what differs (request parameters,
//! XML namespace, value element, collision policy, file naming) lives in one
//! `FeedDescriptor` per feed.

use clap::ValueEnum;

use crate::domain::MeasurementType;

const NS_GENERATION_LOAD: &str = "urn:iec62325.351:tc57wg16:451-6:generationloaddocument:3:0";
const NS_PUBLICATION: &str = "urn:iec62325.351:tc57wg16:451-3:publicationdocument:7:3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FeedKind {
    /// Actual total load (A65 / A16).
    ActualLoad,
    /// Day-ahead total load forecast (A65 / A01), persisted but not merged.
    LoadForecast,
    /// Day-ahead aggregated generation forecast (A71 / A01).
    Generation,
    /// Day-ahead energy prices (A44).
    Price,
}

impl FeedKind {
    /// Feeds stacked into the fact table, in append order.
    pub const MERGED: [FeedKind; 3] = [FeedKind::ActualLoad, FeedKind::Generation, FeedKind::Price];

    pub fn descriptor(self) -> &'static FeedDescriptor {
        match self {
            FeedKind::ActualLoad => &ACTUAL_LOAD,
            FeedKind::LoadForecast => &LOAD_FORECAST,
            FeedKind::Generation => &GENERATION_FORECAST,
            FeedKind::Price => &ENERGY_PRICE,
        }
    }
}

/// How the zone code is passed to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainParams {
    OutBiddingZone,
    In,
    /// Same code as both `out_Domain` and `in_Domain`.
    OutAndIn,
}

impl DomainParams {
    pub fn pairs(self, code: &str) -> Vec<(&'static str, String)> {
        match self {
            DomainParams::OutBiddingZone => vec![("outBiddingZone_Domain", code.to_string())],
            DomainParams::In => vec![("in_Domain", code.to_string())],
            DomainParams::OutAndIn => vec![
                ("out_Domain", code.to_string()),
                ("in_Domain", code.to_string()),
            ],
        }
    }
}

/// What to do with records sharing (timestamp, country, measurement type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Keep the first-seen record untouched.
    KeepFirst,
    /// Keep the largest value and the first-seen day of week.
    Max,
}

/// What to do with local hours after the run's "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuturePolicy {
    Drop,
    /// Keep everything; tag by calendar date as real or forecast.
    Label,
}

#[derive(Debug, Clone)]
pub struct FeedDescriptor {
    pub kind: FeedKind,
    pub label: &'static str,
    pub document_type: &'static str,
    pub process_type: Option<&'static str>,
    pub domain: DomainParams,
    pub namespace: &'static str,
    /// Element holding the value inside each `Point`.
    pub value_field: &'static str,
    /// Value column name in the per-feed file.
    pub value_column: &'static str,
    pub measurement_type: MeasurementType,
    pub unit: &'static str,
    pub dedup: DedupPolicy,
    pub future: FuturePolicy,
    /// Directory under the data root.
    pub dir: &'static str,
    pub file_stem: &'static str,
}

pub static ACTUAL_LOAD: FeedDescriptor = FeedDescriptor {
    kind: FeedKind::ActualLoad,
    label: "Actual Total Load",
    document_type: "A65",
    process_type: Some("A16"),
    domain: DomainParams::OutBiddingZone,
    namespace: NS_GENERATION_LOAD,
    value_field: "quantity",
    value_column: "load_value",
    measurement_type: MeasurementType::ActualLoad,
    unit: "MW",
    dedup: DedupPolicy::KeepFirst,
    future: FuturePolicy::Drop,
    dir: "load",
    file_stem: "all_countries_actual_total_load",
};

pub static LOAD_FORECAST: FeedDescriptor = FeedDescriptor {
    kind: FeedKind::LoadForecast,
    label: "Day-Ahead Total Load Forecast",
    document_type: "A65",
    process_type: Some("A01"),
    domain: DomainParams::OutBiddingZone,
    namespace: NS_GENERATION_LOAD,
    value_field: "quantity",
    value_column: "load_value",
    measurement_type: MeasurementType::LoadForecast,
    unit: "MW",
    dedup: DedupPolicy::KeepFirst,
    future: FuturePolicy::Label,
    dir: "load_forecast",
    file_stem: "all_countries_load",
};

pub static GENERATION_FORECAST: FeedDescriptor = FeedDescriptor {
    kind: FeedKind::Generation,
    label: "Generation Forecast",
    document_type: "A71",
    process_type: Some("A01"),
    domain: DomainParams::In,
    namespace: NS_GENERATION_LOAD,
    value_field: "quantity",
    value_column: "generation_forecast",
    measurement_type: MeasurementType::GenerationForecast,
    unit: "MW",
    dedup: DedupPolicy::Max,
    future: FuturePolicy::Drop,
    dir: "generation",
    file_stem: "all_countries_generation_forecast_day_ahead",
};

pub static ENERGY_PRICE: FeedDescriptor = FeedDescriptor {
    kind: FeedKind::Price,
    label: "Energy Prices",
    document_type: "A44",
    process_type: None,
    domain: DomainParams::OutAndIn,
    namespace: NS_PUBLICATION,
    value_field: "price.amount",
    value_column: "energy_price",
    measurement_type: MeasurementType::EnergyPrice,
    unit: "€/MWh",
    dedup: DedupPolicy::KeepFirst,
    future: FuturePolicy::Drop,
    dir: "price",
    file_stem: "all_countries_energy_prices_day_ahead",
};
