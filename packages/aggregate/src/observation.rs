//! Numeric coercion for pollutant observations.
//!
//! Upstream sends every value as text. This is the one place where that
//! text becomes numbers: an observation either parses completely or is
//! rejected as a whole.

use air_quality_pollutant_models::DEFAULT_UNIT;
use air_quality_station_models::PollutantMeasurement;

/// Why an observation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObservationError {
    /// The average is empty.
    #[error("average value is missing")]
    MissingAverage,

    /// A value is present but is not a finite number.
    #[error("{field} value {value:?} is not a finite number")]
    InvalidNumber {
        /// Which value failed (`"min"`, `"max"` or `"avg"`).
        field: &'static str,
        /// The raw text.
        value: String,
    },
}

/// Parses one observation's raw min/max/avg/unit text.
///
/// Empty `min`/`max` become `None`; `avg` is mandatory. Any value that is
/// present but not a finite number rejects the whole observation, so a
/// measurement is never partially filled. An empty unit falls back to
/// [`DEFAULT_UNIT`].
///
/// # Errors
///
/// Returns [`ObservationError`] if `avg` is empty or any present value is
/// not a finite number.
pub fn parse_observation(
    min: &str,
    max: &str,
    avg: &str,
    unit: &str,
) -> Result<PollutantMeasurement, ObservationError> {
    let min = parse_value("min", min)?;
    let max = parse_value("max", max)?;
    let avg = parse_value("avg", avg)?.ok_or(ObservationError::MissingAverage)?;

    let unit = unit.trim();
    let unit = if unit.is_empty() { DEFAULT_UNIT } else { unit };

    Ok(PollutantMeasurement {
        min,
        max,
        avg,
        unit: unit.to_owned(),
    })
}

/// Parses an optional value. Only the empty string counts as absent;
/// whitespace-only text is invalid.
fn parse_value(field: &'static str, raw: &str) -> Result<Option<f64>, ObservationError> {
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ObservationError::InvalidNumber {
            field,
            value: raw.to_owned(),
        }),
    }
}
