#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weather enrichment for aggregated stations.
//!
//! Enrichment is optional. A [`WeatherEnricher`] looks up current
//! conditions for a coordinate; [`openweather::OpenWeatherClient`] does so
//! against OpenWeatherMap and [`NullEnricher`] is used when no API key is
//! configured. [`enrich_stations`] walks the exported stations one at a
//! time, pausing between requests, and merges the returned fields as extra
//! columns. A failed lookup only skips that station.

pub mod openweather;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use air_quality_source::progress::ProgressCallback;
use air_quality_station_models::ExportRecord;
use serde::Serialize;
use thiserror::Error;

/// Errors from weather lookups.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        /// Status code returned by the server.
        status: reqwest::StatusCode,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Current conditions at one coordinate, flattened to export columns.
///
/// Every field is optional; absent fields produce no column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_feels_like: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_wind_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_wind_direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_visibility: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_clouds: Option<f64>,
    /// Observation time reported by the weather service (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_timestamp: Option<String>,
    /// OpenWeatherMap air quality index, 1 (good) to 5 (very poor).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_aqi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_co: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_no: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_no2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_o3: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_so2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_pm2_5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_pm10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owm_nh3: Option<f64>,
}

impl WeatherObservation {
    /// The populated fields as export columns.
    #[must_use]
    pub fn to_columns(&self) -> BTreeMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// A source of current conditions for a coordinate.
pub trait WeatherEnricher: Send + Sync {
    /// Label recorded in export metadata, or `None` when enrichment is
    /// disabled.
    fn source_name(&self) -> Option<&str>;

    /// Looks up current conditions.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] if the lookup fails.
    fn observe(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<WeatherObservation, WeatherError>> + Send;

    /// Whether lookups should be attempted at all.
    fn is_enabled(&self) -> bool {
        self.source_name().is_some()
    }
}

/// Enricher used when weather is not configured: never looks anything up.
pub struct NullEnricher;

impl WeatherEnricher for NullEnricher {
    fn source_name(&self) -> Option<&str> {
        None
    }

    async fn observe(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<WeatherObservation, WeatherError> {
        Ok(WeatherObservation::default())
    }
}

/// Merges current conditions into every station that has coordinates.
///
/// Stations are looked up one at a time with `delay` between requests. A
/// failed lookup is logged and that station is left as is. Returns the
/// number of stations enriched.
pub async fn enrich_stations(
    enricher: &impl WeatherEnricher,
    records: &mut [ExportRecord],
    delay: Duration,
    progress: &Arc<dyn ProgressCallback>,
) -> usize {
    if !enricher.is_enabled() {
        return 0;
    }

    progress.set_total(records.len() as u64);
    let mut enriched = 0;

    for (i, record) in records.iter_mut().enumerate() {
        progress.inc(1);

        let (Some(lat), Some(lon)) = (record.latitude, record.longitude) else {
            log::debug!("{}: no coordinates, skipping weather", record.station_name);
            continue;
        };

        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        progress.set_message(format!("Weather for {}", record.station_name));
        match enricher.observe(lat, lon).await {
            Ok(observation) => {
                record.merge_columns(observation.to_columns());
                enriched += 1;
            }
            Err(e) => {
                log::warn!("{}: weather lookup failed: {e}", record.station_name);
            }
        }
    }

    progress.finish(format!("Weather added to {enriched} stations"));
    enriched
}

/// Looks up conditions for the region as a whole (its centre point).
///
/// Returns `None` when enrichment is disabled or the lookup fails.
pub async fn region_weather(
    enricher: &impl WeatherEnricher,
    latitude: f64,
    longitude: f64,
) -> Option<WeatherObservation> {
    if !enricher.is_enabled() {
        return None;
    }

    match enricher.observe(latitude, longitude).await {
        Ok(observation) => Some(observation),
        Err(e) => {
            log::warn!("Region weather lookup failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use air_quality_source::progress::null_progress;

    use super::*;

    /// Returns a fixed temperature, failing for one latitude.
    struct FakeEnricher {
        fail_at: f64,
        calls: Mutex<Vec<(f64, f64)>>,
    }

    impl WeatherEnricher for FakeEnricher {
        fn source_name(&self) -> Option<&str> {
            Some("fake")
        }

        async fn observe(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<WeatherObservation, WeatherError> {
            self.calls.lock().unwrap().push((latitude, longitude));
            if (latitude - self.fail_at).abs() < f64::EPSILON {
                return Err(WeatherError::RateLimited);
            }
            Ok(WeatherObservation {
                weather_temperature: Some(31.5),
                weather_description: Some("haze".to_owned()),
                ..WeatherObservation::default()
            })
        }
    }

    fn record(name: &str, lat: Option<f64>) -> ExportRecord {
        ExportRecord {
            station_name: name.to_owned(),
            city: "Delhi".to_owned(),
            state: "Delhi".to_owned(),
            latitude: lat,
            longitude: lat.map(|_| 77.2),
            last_update: String::new(),
            total_pollutants_monitored: 1,
            columns: BTreeMap::from([("pm25_avg".to_owned(), serde_json::json!(55.0))]),
        }
    }

    #[test]
    fn columns_skip_absent_fields() {
        let observation = WeatherObservation {
            weather_humidity: Some(40.0),
            owm_aqi: Some(4.0),
            ..WeatherObservation::default()
        };

        let columns = observation.to_columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns["weather_humidity"], 40.0);
        assert_eq!(columns["owm_aqi"], 4.0);
    }

    #[tokio::test]
    async fn merges_weather_and_skips_failures() {
        let enricher = FakeEnricher {
            fail_at: 2.0,
            calls: Mutex::new(Vec::new()),
        };
        let mut records = vec![
            record("A", Some(1.0)),
            record("B", Some(2.0)),
            record("C", None),
        ];

        let enriched =
            enrich_stations(&enricher, &mut records, Duration::ZERO, &null_progress()).await;

        assert_eq!(enriched, 1);
        assert_eq!(records[0].columns["weather_temperature"], 31.5);
        assert_eq!(records[0].columns["weather_description"], "haze");
        assert_eq!(records[0].columns["pm25_avg"], 55.0);
        assert!(!records[1].columns.contains_key("weather_temperature"));
        assert_eq!(records[2].columns.len(), 1);
        assert_eq!(enricher.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn null_enricher_changes_nothing() {
        let mut records = vec![record("A", Some(1.0))];
        let before = records.clone();

        let enriched =
            enrich_stations(&NullEnricher, &mut records, Duration::ZERO, &null_progress()).await;

        assert_eq!(enriched, 0);
        assert_eq!(records, before);
        assert!(region_weather(&NullEnricher, 28.6, 77.2).await.is_none());
    }

    #[tokio::test]
    async fn region_weather_swallows_errors() {
        let enricher = FakeEnricher {
            fail_at: 28.6,
            calls: Mutex::new(Vec::new()),
        };

        assert!(region_weather(&enricher, 28.6, 77.2).await.is_none());
        assert!(region_weather(&enricher, 19.0, 72.8).await.is_some());
    }
}
