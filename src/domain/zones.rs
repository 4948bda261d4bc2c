//! Zone tables: the built-in European table and JSON overrides.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::domain::Zone;
use crate::error::AppError;

const DEFAULT_ZONES: &[(&str, &[&str])] = &[
    ("Albania", &["10YAL-KESH-----5"]),
    ("Austria", &["10YAT-APG------L"]),
    ("Belgium", &["10YBE----------2"]),
    ("Bosnia_and_Herzegovina", &["10YBA-JPCC-----D"]),
    ("Bulgaria", &["10YCA-BULGARIA-R"]),
    ("Croatia", &["10YHR-HEP------M"]),
    ("Czech_Republic", &["10YCZ-CEPS-----N"]),
    (
        "Denmark",
        &["10Y1001A1001A65H", "10Y1001A1001A64J", "10YDK-1--------W", "10YDK-2--------M"],
    ),
    ("Estonia", &["10Y1001A1001A39I"]),
    ("Finland", &["10YFI-1--------U"]),
    ("France", &["10YFR-RTE------C"]),
    ("Georgia", &["10Y1001A1001B012"]),
    (
        "Germany",
        &[
            "10Y1001A1001A83F",
            "10Y1001A1001A63L",
            "10YDE-ENBW-----N",
            "10YDE-EON------1",
            "10YDE-RWENET---I",
            "10YDE-VE-------2",
        ],
    ),
    ("Greece", &["10YGR-HTSO-----Y"]),
    ("Hungary", &["10YHU-MAVIR----U"]),
    (
        "Ireland",
        &["10Y1001A1001A016", "10YIE-1001A00010", "10Y1001A1001A59C", "10Y1001A1001A63L"],
    ),
    (
        "Italy",
        &[
            "10Y1001A1001A67D",
            "10Y1001A1001A68B",
            "10Y1001A1001A70O",
            "10Y1001A1001A71M",
            "10Y1001A1001A75E",
            "10Y1001A1001A74G",
            "10Y1001A1001A73I",
            "10Y1001A1001A788",
            "10Y1001A1001A796",
        ],
    ),
    ("Kosovo", &["10Y1001C--00100H"]),
    ("Latvia", &["10YLV-1001A00074"]),
    ("Lithuania", &["10YLT-1001A0008Q"]),
    ("Luxembourg", &["10YLU-CEGEDEL-NQ"]),
    ("Montenegro", &["10YCS-CG-TSO---S"]),
    ("Netherlands", &["10YNL----------L"]),
    ("North_Macedonia", &["10YMK-MEPSO----8"]),
    (
        "Norway",
        &[
            "10YNO-0--------C",
            "10YNO-1--------2",
            "10YNO-2--------T",
            "10YNO-3--------J",
            "10YNO-4--------9",
            "10Y1001A1001A48H",
        ],
    ),
    ("Poland", &["10YPL-AREA-----S"]),
    ("Portugal", &["10YPT-REN------W"]),
    ("Romania", &["10YRO-TEL------P"]),
    ("Serbia", &["10YCS-SERBIATSOV"]),
    ("Spain", &["10YES-REE------0"]),
    (
        "Sweden",
        &["10Y1001A1001A44P", "10Y1001A1001A45N", "10Y1001A1001A46L", "10Y1001A1001A47J"],
    ),
    ("Switzerland", &["10YCH-SWISSGRIDZ"]),
];

/// The built-in zone table, in name order.
pub fn default_zones() -> Vec<Zone> {
    let mut zones: Vec<Zone> = DEFAULT_ZONES
        .iter()
        .map(|(name, codes)| Zone::new(*name, codes.iter().copied()))
        .collect();
    zones.sort_by(|a, b| a.name.cmp(&b.name));
    zones
}

/// Accepted zone file layouts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZoneFile {
    /// `{"Austria": ["10YAT-APG------L"], ...}`
    Table(BTreeMap<String, Vec<String>>),
    /// `[{"name": "Austria", "codes": [...]}, ...]`, as printed by `ef zones --json`.
    List(Vec<Zone>),
}

/// Read a zone table from JSON, either a `name -> [codes...]` object or a
/// list of zones. Returned in name order.
pub fn read_zones_json(path: &Path) -> Result<Vec<Zone>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open zone file '{}': {e}", path.display())))?;
    let parsed: ZoneFile = serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid zone file '{}': {e}", path.display())))?;

    let mut zones: Vec<Zone> = match parsed {
        ZoneFile::Table(table) => table.into_iter().map(|(name, codes)| Zone { name, codes }).collect(),
        ZoneFile::List(zones) => zones,
    };
    zones.sort_by(|a, b| a.name.cmp(&b.name));
    validate_zones(&zones)?;
    Ok(zones)
}

/// Zones as a pretty JSON list, readable back by [`read_zones_json`].
pub fn zones_to_json(zones: &[Zone]) -> Result<String, AppError> {
    serde_json::to_string_pretty(zones).map_err(|e| AppError::config(format!("Failed to encode zones: {e}")))
}

/// Every zone needs a name and at least one non-blank code.
pub fn validate_zones(zones: &[Zone]) -> Result<(), AppError> {
    if zones.is_empty() {
        return Err(AppError::config("Zone table is empty."));
    }
    for zone in zones {
        if zone.name.trim().is_empty() {
            return Err(AppError::config("Zone with an empty name."));
        }
        if zones.iter().filter(|z| z.name == zone.name).count() > 1 {
            return Err(AppError::config(format!("Zone '{}' is listed more than once.", zone.name)));
        }
        if zone.codes.is_empty() || zone.codes.iter().any(|c| c.trim().is_empty()) {
            return Err(AppError::config(format!(
                "Zone '{}' needs at least one non-blank code.",
                zone.name
            )));
        }
    }
    Ok(())
}

/// Keep only the named countries (case-insensitive). An empty filter keeps all.
pub fn filter_zones(zones: Vec<Zone>, countries: &[String]) -> Result<Vec<Zone>, AppError> {
    if countries.is_empty() {
        return Ok(zones);
    }
    for wanted in countries {
        if !zones.iter().any(|z| z.name.eq_ignore_ascii_case(wanted.trim())) {
            return Err(AppError::config(format!("Unknown country '{wanted}'.")));
        }
    }
    Ok(zones
        .into_iter()
        .filter(|z| countries.iter().any(|c| z.name.eq_ignore_ascii_case(c.trim())))
        .collect())
}
