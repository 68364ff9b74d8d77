#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Writers for aggregated station data.
//!
//! [`tabular`] writes one CSV row per station over the union of every
//! station's columns; [`document`] writes a JSON document with run metadata.
//! Both refuse to write an empty station list.

pub mod document;
pub mod tabular;

pub use document::{DATA_DESCRIPTION, ExportMetadata, write_json};
pub use tabular::{csv_columns, write_csv};

use chrono::NaiveDateTime;

/// Errors that can occur while writing an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// There were no stations to write.
    #[error("No station data to export")]
    NoData,
}

/// File name used when the caller does not pick one, e.g.
/// `delhi_air_quality_clean_20251103_134502.csv`.
#[must_use]
pub fn default_filename(region_id: &str, extension: &str, at: NaiveDateTime) -> String {
    format!(
        "{region_id}_air_quality_clean_{}.{extension}",
        at.format("%Y%m%d_%H%M%S")
    )
}
