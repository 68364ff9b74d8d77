//! OpenWeatherMap client.
//!
//! Two endpoints are queried per coordinate, both with `lat`, `lon` and
//! `appid`:
//!
//! - `/weather` (with `units`) returns `.main.{temp,feels_like,humidity,pressure}`,
//!   `.weather[0].description`, `.wind.{speed,deg}`, `.visibility`,
//!   `.clouds.all` and `.dt` (epoch seconds).
//! - `/air_pollution` returns `.list[0].main.aqi` and
//!   `.list[0].components.{co,no,no2,o3,so2,pm2_5,pm10,nh3}` in µg/m³.
//!
//! The free tier allows 60 calls per minute; callers pace requests (see
//! [`WeatherConfig::station_delay`]).

use std::time::Duration;

use chrono::DateTime;

use crate::{WeatherEnricher, WeatherError, WeatherObservation};

/// OpenWeatherMap settings.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Unit system for `/weather` (`"metric"`, `"imperial"` or `"standard"`).
    pub units: String,
    /// Pause between per-station lookups.
    pub station_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".to_owned(),
            units: "metric".to_owned(),
            station_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Looks up weather and air pollution from OpenWeatherMap.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
    api_key: String,
}

impl OpenWeatherClient {
    /// Label recorded in export metadata.
    pub const SOURCE_NAME: &'static str = "OpenWeatherMap";

    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, config: WeatherConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.to_owned(),
        })
    }

    /// Returns the client settings.
    #[must_use]
    pub const fn config(&self) -> &WeatherConfig {
        &self.config
    }

    async fn get_json(
        &self,
        endpoint: &str,
        latitude: f64,
        longitude: f64,
        extra: &[(&str, &str)],
    ) -> Result<serde_json::Value, WeatherError> {
        let url = format!("{}/{endpoint}", self.config.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", latitude.to_string().as_str()),
                ("lon", longitude.to_string().as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .query(extra)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(WeatherError::RateLimited);
        }
        if !status.is_success() {
            return Err(WeatherError::Status { status });
        }

        Ok(resp.json().await?)
    }
}

impl WeatherEnricher for OpenWeatherClient {
    fn source_name(&self) -> Option<&str> {
        Some(Self::SOURCE_NAME)
    }

    async fn observe(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherObservation, WeatherError> {
        let weather = self
            .get_json(
                "weather",
                latitude,
                longitude,
                &[("units", self.config.units.as_str())],
            )
            .await?;
        let mut observation = parse_weather(&weather)?;

        match self
            .get_json("air_pollution", latitude, longitude, &[])
            .await
        {
            Ok(body) => apply_air_pollution(&body, &mut observation),
            Err(e) => log::warn!("Air pollution lookup failed at ({latitude}, {longitude}): {e}"),
        }

        Ok(observation)
    }
}

/// Parses a `/weather` response.
fn parse_weather(body: &serde_json::Value) -> Result<WeatherObservation, WeatherError> {
    let main = body.get("main").ok_or_else(|| WeatherError::Parse {
        message: "weather response has no 'main' object".to_string(),
    })?;

    Ok(WeatherObservation {
        weather_temperature: main["temp"].as_f64(),
        weather_feels_like: main["feels_like"].as_f64(),
        weather_humidity: main["humidity"].as_f64(),
        weather_pressure: main["pressure"].as_f64(),
        weather_description: body["weather"][0]["description"]
            .as_str()
            .map(String::from),
        weather_wind_speed: body["wind"]["speed"].as_f64(),
        weather_wind_direction: body["wind"]["deg"].as_f64(),
        weather_visibility: body["visibility"].as_f64(),
        weather_clouds: body["clouds"]["all"].as_f64(),
        weather_timestamp: body["dt"]
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339()),
        ..WeatherObservation::default()
    })
}

/// Copies `/air_pollution` fields into `observation`. Missing fields are
/// left unset.
fn apply_air_pollution(body: &serde_json::Value, observation: &mut WeatherObservation) {
    let entry = &body["list"][0];
    let components = &entry["components"];

    observation.owm_aqi = entry["main"]["aqi"].as_f64();
    observation.owm_co = components["co"].as_f64();
    observation.owm_no = components["no"].as_f64();
    observation.owm_no2 = components["no2"].as_f64();
    observation.owm_o3 = components["o3"].as_f64();
    observation.owm_so2 = components["so2"].as_f64();
    observation.owm_pm2_5 = components["pm2_5"].as_f64();
    observation.owm_pm10 = components["pm10"].as_f64();
    observation.owm_nh3 = components["nh3"].as_f64();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weather_response() {
        let body = serde_json::json!({
            "weather": [{"id": 721, "main": "Haze", "description": "haze"}],
            "main": {"temp": 29.05, "feels_like": 30.1, "pressure": 1012, "humidity": 58},
            "visibility": 2500,
            "wind": {"speed": 2.06, "deg": 290},
            "clouds": {"all": 0},
            "dt": 1_762_170_000
        });

        let observation = parse_weather(&body).unwrap();

        assert_eq!(observation.weather_temperature, Some(29.05));
        assert_eq!(observation.weather_humidity, Some(58.0));
        assert_eq!(observation.weather_pressure, Some(1012.0));
        assert_eq!(observation.weather_description.as_deref(), Some("haze"));
        assert_eq!(observation.weather_wind_direction, Some(290.0));
        assert_eq!(observation.weather_clouds, Some(0.0));
        assert_eq!(
            observation.weather_timestamp.as_deref(),
            Some("2025-11-03T11:40:00+00:00")
        );
        assert!(observation.owm_aqi.is_none());
    }

    #[test]
    fn weather_without_main_is_an_error() {
        let body = serde_json::json!({"cod": 401, "message": "Invalid API key"});
        assert!(matches!(
            parse_weather(&body),
            Err(WeatherError::Parse { .. })
        ));
    }

    #[test]
    fn applies_air_pollution_components() {
        let body = serde_json::json!({
            "coord": {"lon": 77.209, "lat": 28.6139},
            "list": [{
                "main": {"aqi": 5},
                "components": {
                    "co": 1922.6, "no": 0.64, "no2": 49.35, "o3": 80.11,
                    "so2": 24.32, "pm2_5": 187.9, "pm10": 242.5, "nh3": 21.03
                },
                "dt": 1_762_170_000
            }]
        });
        let mut observation = WeatherObservation::default();

        apply_air_pollution(&body, &mut observation);

        assert_eq!(observation.owm_aqi, Some(5.0));
        assert_eq!(observation.owm_pm2_5, Some(187.9));
        assert_eq!(observation.owm_nh3, Some(21.03));
    }

    #[test]
    fn empty_air_pollution_leaves_fields_unset() {
        let mut observation = WeatherObservation::default();
        apply_air_pollution(&serde_json::json!({"list": []}), &mut observation);
        assert_eq!(observation, WeatherObservation::default());
    }

    #[test]
    fn default_config_paces_requests() {
        let config = WeatherConfig::default();
        assert_eq!(config.units, "metric");
        assert_eq!(config.station_delay, Duration::from_millis(500));
        assert!(!config.base_url.ends_with('/'));
    }
}
