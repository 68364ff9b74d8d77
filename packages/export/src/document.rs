//! JSON export.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use air_quality_pollutant_models::Pollutant;
use air_quality_station_models::ExportRecord;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::ExportError;

/// Description stored in every JSON export.
pub const DATA_DESCRIPTION: &str =
    "Only stations and pollutants with actual measurement data included";

/// The `metadata` object of a JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportMetadata {
    /// Local time the export was produced (ISO-8601, microseconds).
    pub fetch_timestamp: String,
    pub total_stations: usize,
    /// Upper-case pollutant labels with an `_avg` column on any station,
    /// sorted.
    pub pollutants_available: Vec<String>,
    /// Landing page of the upstream dataset.
    pub source: String,
    pub data_description: String,
    /// Set when weather enrichment ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_source: Option<String>,
}

impl ExportMetadata {
    /// Builds metadata describing `records`.
    #[must_use]
    pub fn new(
        records: &[ExportRecord],
        source: &str,
        weather_source: Option<&str>,
        at: NaiveDateTime,
    ) -> Self {
        let pollutants_available: BTreeSet<String> = records
            .iter()
            .flat_map(ExportRecord::pollutants)
            .map(Pollutant::label)
            .collect();

        Self {
            fetch_timestamp: at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            total_stations: records.len(),
            pollutants_available: pollutants_available.into_iter().collect(),
            source: source.to_owned(),
            data_description: DATA_DESCRIPTION.to_owned(),
            weather_source: weather_source.map(str::to_owned),
        }
    }
}

#[derive(Serialize)]
struct Document<'a> {
    metadata: &'a ExportMetadata,
    air_quality_data: &'a [ExportRecord],
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Writes `records` with `metadata` as pretty-printed JSON.
///
/// `region_weather`, when given, is stored as an extra top-level entry
/// (e.g. `delhi_general_weather`). The file is written to a temporary
/// sibling first and renamed into place.
///
/// # Errors
///
/// Returns [`ExportError::NoData`] if `records` is empty, or an I/O or
/// serialization error.
pub fn write_json(
    path: &Path,
    records: &[ExportRecord],
    metadata: &ExportMetadata,
    region_weather: Option<(String, serde_json::Value)>,
) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoData);
    }

    let document = Document {
        metadata,
        air_quality_data: records,
        extra: region_weather.into_iter().collect(),
    };
    let contents = serde_json::to_string_pretty(&document)?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;

    log::info!("Wrote {} stations to {}", records.len(), path.display());
    Ok(records.len())
}
