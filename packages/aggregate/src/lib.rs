#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Station aggregation engine.
//!
//! Upstream reports one pollutant per row, so a station monitoring seven
//! pollutants shows up as seven rows. [`StationAggregator`] folds those rows
//! into one [`StationAggregate`] per physical station:
//!
//! - rows without a pollutant label or average are ignored,
//! - pollutants outside the [`Pollutant`] allow-list are dropped,
//! - observations with non-numeric values are dropped whole
//!   ([`observation::parse_observation`]),
//! - a later row for the same station and pollutant replaces the earlier one,
//! - stations left without any pollutant are not emitted.
//!
//! [`flatten`] then turns each aggregate into an [`ExportRecord`] and
//! [`summary::coverage_summary`] computes run statistics.
//!
//! [`Pollutant`]: air_quality_pollutant_models::Pollutant

pub mod observation;
pub mod station;
pub mod summary;

pub use station::{Aggregation, AggregationStats, StationAggregator, aggregate_by_station};

use air_quality_station_models::{ExportRecord, StationAggregate};

/// Flattens an aggregate into base fields plus
/// `<pollutant>_min/_max/_avg/_unit` columns for each pollutant present.
#[must_use]
pub fn flatten(station: &StationAggregate) -> ExportRecord {
    let mut columns = std::collections::BTreeMap::new();

    for (pollutant, measurement) in &station.pollutants {
        columns.insert(
            pollutant.column("min"),
            measurement.min.map_or(serde_json::Value::Null, Into::into),
        );
        columns.insert(
            pollutant.column("max"),
            measurement.max.map_or(serde_json::Value::Null, Into::into),
        );
        columns.insert(pollutant.column("avg"), measurement.avg.into());
        columns.insert(pollutant.column("unit"), measurement.unit.clone().into());
    }

    ExportRecord {
        station_name: station.station_name.clone(),
        city: station.city.clone(),
        state: station.state.clone(),
        latitude: station.latitude,
        longitude: station.longitude,
        last_update: station.last_update.clone(),
        total_pollutants_monitored: station.total_pollutants_monitored(),
        columns,
    }
}

/// Flattens every aggregate, preserving order.
#[must_use]
pub fn to_export_records(stations: &[StationAggregate]) -> Vec<ExportRecord> {
    stations.iter().map(flatten).collect()
}
