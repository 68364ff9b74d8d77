//! Config-driven region definition.
//!
//! A [`RegionDefinition`] captures everything region-specific about a run:
//! the upstream filters, the default city/state/country applied to rows
//! that omit them, and the region centre used for region-wide weather.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::SourceError;

/// A metropolitan area whose stations are fetched in one run.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionDefinition {
    /// Unique identifier (e.g., `"delhi"`). Also used as the output file
    /// prefix.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Default city for rows that omit one.
    pub city: String,
    /// Default state for rows that omit one.
    pub state: String,
    /// Default country for rows that omit one.
    pub country: String,
    /// Latitude of the region centre.
    pub latitude: f64,
    /// Longitude of the region centre.
    pub longitude: f64,
    /// How to query the upstream station API.
    pub fetcher: FetcherConfig,
}

/// Upstream station API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Base resource URL (e.g., `"https://api.data.gov.in/resource"`).
    pub api_url: String,
    /// Dataset resource ID appended to `api_url`.
    pub resource_id: String,
    /// Human-facing dataset page, recorded in export metadata.
    pub source_url: String,
    /// Records requested per page.
    pub page_size: u64,
    /// Delay between page requests in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Field filters sent as `filters[<key>]=<value>`.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

const fn default_delay_ms() -> u64 {
    1000
}

const fn default_timeout_secs() -> u64 {
    30
}

impl RegionDefinition {
    /// Returns the region identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable region name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full URL of the resource endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.fetcher.api_url.trim_end_matches('/'),
            self.fetcher.resource_id
        )
    }

    /// Pause between page requests.
    #[must_use]
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.fetcher.delay_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetcher.timeout_secs)
    }
}

/// Parses and validates a region definition from TOML.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the TOML is malformed or the
/// definition is unusable (empty ID, zero page size).
pub fn parse_region_toml(toml_str: &str) -> Result<RegionDefinition, SourceError> {
    let region: RegionDefinition = toml::from_str(toml_str).map_err(|e| SourceError::Config {
        message: e.to_string(),
    })?;

    if region.id.trim().is_empty() {
        return Err(SourceError::Config {
            message: "region id is empty".to_string(),
        });
    }
    if region.fetcher.page_size == 0 {
        return Err(SourceError::Config {
            message: format!("{}: page_size must be greater than zero", region.id),
        });
    }

    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        id = "testville"
        name = "Testville"
        city = "Testville"
        state = "Test State"
        country = "India"
        latitude = 10.0
        longitude = 20.0

        [fetcher]
        api_url = "https://example.org/resource/"
        resource_id = "abc-123"
        source_url = "https://example.org/dataset"
        page_size = 50
    "#;

    #[test]
    fn parses_minimal_region_with_defaults() {
        let region = parse_region_toml(MINIMAL).unwrap();
        assert_eq!(region.id(), "testville");
        assert_eq!(region.fetcher.delay_ms, 1000);
        assert_eq!(region.fetcher.timeout_secs, 30);
        assert!(region.fetcher.filters.is_empty());
        assert_eq!(region.page_delay(), Duration::from_secs(1));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let region = parse_region_toml(MINIMAL).unwrap();
        assert_eq!(region.endpoint(), "https://example.org/resource/abc-123");
    }

    #[test]
    fn rejects_zero_page_size() {
        let toml = MINIMAL.replace("page_size = 50", "page_size = 0");
        let err = parse_region_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            parse_region_toml("id = "),
            Err(SourceError::Config { .. })
        ));
    }
}
