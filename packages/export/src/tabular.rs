//! CSV export.

use std::collections::BTreeSet;
use std::path::Path;

use air_quality_station_models::{BASE_COLUMNS, ExportRecord};

use crate::ExportError;

/// Header row for a set of records.
///
/// The base columns come first, always, in their fixed order. Every other
/// column seen on any record follows in alphabetical order, except columns
/// that are null or missing on every record.
#[must_use]
pub fn csv_columns(records: &[ExportRecord]) -> Vec<String> {
    let extra: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.columns.iter())
        .filter(|(_, v)| !v.is_null())
        .map(|(k, _)| k.as_str())
        .filter(|k| !BASE_COLUMNS.contains(k))
        .collect();

    BASE_COLUMNS
        .iter()
        .copied()
        .chain(extra)
        .map(str::to_owned)
        .collect()
}

/// Writes one row per station to `path`.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`ExportError::NoData`] if `records` is empty, or an I/O or CSV
/// error if the file cannot be written.
pub fn write_csv(path: &Path, records: &[ExportRecord]) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoData);
    }

    let columns = csv_columns(records);
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&columns)?;

    for record in records {
        writer.write_record(columns.iter().map(|c| cell(record, c)))?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} stations x {} columns to {}",
        records.len(),
        columns.len(),
        path.display()
    );
    Ok(records.len())
}

fn cell(record: &ExportRecord, column: &str) -> String {
    match record.value(column) {
        None => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}
