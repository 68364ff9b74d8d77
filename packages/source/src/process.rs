//! Raw row to [`FlatRecord`] conversion.

use air_quality_station_models::{FlatRecord, RawApiRecord};
use chrono::{Local, NaiveDateTime};

use crate::region_def::RegionDefinition;

/// Flattens a raw row, stamping it with the current local time.
#[must_use]
pub fn process_record(record: &RawApiRecord, region: &RegionDefinition) -> FlatRecord {
    process_record_at(record, region, Local::now().naive_local())
}

/// Flattens a raw row, stamping it with `processed_at`.
///
/// Absent fields become empty strings, except city, state and country which
/// fall back to the region's names. A field that is present but empty stays
/// empty. Numeric fields are passed through untouched; they are validated
/// during aggregation.
#[must_use]
pub fn process_record_at(
    record: &RawApiRecord,
    region: &RegionDefinition,
    processed_at: NaiveDateTime,
) -> FlatRecord {
    let text = |field: &Option<String>| field.clone().unwrap_or_default();
    let or_region = |field: &Option<String>, fallback: &str| {
        field.clone().unwrap_or_else(|| fallback.to_owned())
    };

    FlatRecord {
        timestamp: processed_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        fetch_date: processed_at.format("%Y-%m-%d").to_string(),
        station_id: text(&record.id),
        station_name: text(&record.station),
        city: or_region(&record.city, &region.city),
        state: or_region(&record.state, &region.state),
        country: or_region(&record.country, &region.country),
        latitude: text(&record.latitude),
        longitude: text(&record.longitude),
        last_update: text(&record.last_update),
        pollutant_id: text(&record.pollutant_id),
        pollutant_min: text(&record.min_value),
        pollutant_max: text(&record.max_value),
        pollutant_avg: text(&record.avg_value),
        pollutant_unit: text(&record.pollutant_unit),
    }
}
