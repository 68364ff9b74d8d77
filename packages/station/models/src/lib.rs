#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types flowing through the station pipeline.
//!
//! Upstream rows arrive as [`RawApiRecord`]s (one pollutant observation per
//! row), are flattened into [`FlatRecord`]s with defaulted fields, folded
//! into one [`StationAggregate`] per physical station and finally flattened
//! into variable-width [`ExportRecord`]s for CSV/JSON output.

use std::collections::{BTreeMap, BTreeSet};

use air_quality_pollutant_models::Pollutant;
use serde::{Deserialize, Deserializer, Serialize};

/// Columns that lead every CSV export, in order.
pub const BASE_COLUMNS: &[&str] = &[
    "station_name",
    "city",
    "state",
    "latitude",
    "longitude",
    "last_update",
    "total_pollutants_monitored",
];

/// One upstream row: a single (station, pollutant) observation.
///
/// Every field is optional. Upstream mostly sends strings, but numeric and
/// boolean scalars are accepted and kept in their textual form; `null` is
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawApiRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub station: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub longitude: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pollutant_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub min_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub max_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avg_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pollutant_unit: Option<String>,
}

impl RawApiRecord {
    /// Decodes a record from one element of the upstream `records` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a JSON object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// A [`RawApiRecord`] with every field defaulted, plus the capture time.
///
/// `timestamp` and `fetch_date` record when the row was processed, not when
/// it was observed; `last_update` carries the observation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    /// ISO-8601 processing instant.
    pub timestamp: String,
    /// Processing date (`YYYY-MM-DD`).
    pub fetch_date: String,
    pub station_id: String,
    pub station_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub latitude: String,
    pub longitude: String,
    pub last_update: String,
    /// Raw vendor pollutant label, before normalization.
    pub pollutant_id: String,
    pub pollutant_min: String,
    pub pollutant_max: String,
    pub pollutant_avg: String,
    pub pollutant_unit: String,
}

/// Identity of a physical station.
///
/// Built from the untrimmed name and the coordinate strings exactly as
/// received. The same name at different coordinates is a different station.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationKey {
    pub station_name: String,
    pub latitude: String,
    pub longitude: String,
}

impl From<&FlatRecord> for StationKey {
    fn from(record: &FlatRecord) -> Self {
        Self {
            station_name: record.station_name.clone(),
            latitude: record.latitude.clone(),
            longitude: record.longitude.clone(),
        }
    }
}

/// One pollutant's reading at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantMeasurement {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Always finite.
    pub avg: f64,
    pub unit: String,
}

/// All recognized pollutant readings for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAggregate {
    pub station_name: String,
    pub city: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_update: String,
    pub pollutants: BTreeMap<Pollutant, PollutantMeasurement>,
}

impl StationAggregate {
    /// Number of distinct allow-listed pollutants with a reading.
    #[must_use]
    pub fn total_pollutants_monitored(&self) -> usize {
        self.pollutants.len()
    }
}

/// A station flattened to scalar columns for export.
///
/// Pollutant (and, when enrichment ran, weather) columns live in
/// `columns`, so records for different stations have different widths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub station_name: String,
    pub city: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_update: String,
    pub total_pollutants_monitored: usize,
    #[serde(flatten)]
    pub columns: BTreeMap<String, serde_json::Value>,
}

impl ExportRecord {
    /// Returns the value of any column, base or dynamic, as JSON.
    ///
    /// Missing columns and absent coordinates are `None`.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<serde_json::Value> {
        match column {
            "station_name" => Some(self.station_name.clone().into()),
            "city" => Some(self.city.clone().into()),
            "state" => Some(self.state.clone().into()),
            "latitude" => self.latitude.map(Into::into),
            "longitude" => self.longitude.map(Into::into),
            "last_update" => Some(self.last_update.clone().into()),
            "total_pollutants_monitored" => Some(self.total_pollutants_monitored.into()),
            other => self.columns.get(other).filter(|v| !v.is_null()).cloned(),
        }
    }

    /// Allow-listed pollutants that have an `_avg` column on this record.
    #[must_use]
    pub fn pollutants(&self) -> BTreeSet<Pollutant> {
        Pollutant::all()
            .iter()
            .copied()
            .filter(|p| self.columns.contains_key(&p.column("avg")))
            .collect()
    }

    /// Adds extra columns (e.g. weather fields), replacing same-named ones.
    pub fn merge_columns(&mut self, extra: BTreeMap<String, serde_json::Value>) {
        self.columns.extend(extra);
    }
}

/// Per-station line in a [`CoverageSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub pollutant_count: usize,
}

/// Earliest and latest fetch dates among raw records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

/// Read-only statistics about one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub raw_records: usize,
    pub unique_stations: usize,
    /// Raw pollutant labels as received, before normalization and
    /// allow-list filtering.
    pub pollutants_found: BTreeSet<String>,
    /// Raw observation count per raw label.
    pub pollutant_coverage: BTreeMap<String, usize>,
    pub stations: Vec<StationSummary>,
    pub date_range: Option<DateRange>,
    /// Allow-listed pollutants present in at least one aggregate.
    pub pollutants_available: BTreeSet<Pollutant>,
}
