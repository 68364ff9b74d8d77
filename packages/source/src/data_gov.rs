//! data.gov.in resource API client.
//!
//! The real-time air quality resource is a CKAN-style endpoint:
//! `GET {api_url}/{resource_id}?api-key=..&format=json&limit=..&offset=..`
//! with optional `filters[<field>]=<value>` parameters. Each response wraps
//! the rows in a `records` array and reports the total row count in
//! `total`.

use air_quality_station_models::RawApiRecord;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::SourceError;
use crate::pagination::{PageSource, RecordPage};
use crate::region_def::RegionDefinition;
use crate::retry;

/// `User-Agent` sent with every request.
const CLIENT_USER_AGENT: &str = concat!("air-quality-fetch/", env!("CARGO_PKG_VERSION"));

/// Page source backed by the data.gov.in resource API.
pub struct DataGovClient {
    client: reqwest::Client,
    endpoint: String,
    label: String,
    api_key: String,
    page_size: u64,
    filters: Vec<(String, String)>,
}

impl DataGovClient {
    /// Creates a client for the given region.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(region: &RegionDefinition, api_key: &str) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(region.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: region.endpoint(),
            label: region.name.clone(),
            api_key: api_key.to_owned(),
            page_size: region.fetcher.page_size,
            filters: region
                .fetcher
                .filters
                .iter()
                .map(|(k, v)| (format!("filters[{k}]"), v.clone()))
                .collect(),
        })
    }

    /// Query parameters for the page starting at `offset`.
    fn query(&self, offset: u64) -> Vec<(String, String)> {
        let mut params = vec![
            ("api-key".to_owned(), self.api_key.clone()),
            ("format".to_owned(), "json".to_owned()),
            ("limit".to_owned(), self.page_size.to_string()),
            ("offset".to_owned(), offset.to_string()),
        ];
        params.extend(self.filters.iter().cloned());
        params
    }
}

/// Extracts the `records` array from a response body.
///
/// Returns `None` when the body has no `records` array. Elements that are
/// not objects are skipped with a warning.
#[must_use]
pub fn extract_page(body: &serde_json::Value) -> Option<RecordPage> {
    let rows = body.get("records")?.as_array()?;

    let records = rows
        .iter()
        .filter_map(|row| match RawApiRecord::from_value(row.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping malformed record: {e}");
                None
            }
        })
        .collect();

    // `total` is numeric in some dataset versions and a string in others.
    let total = body.get("total").and_then(|t| {
        t.as_u64()
            .or_else(|| t.as_str().and_then(|s| s.parse().ok()))
    });

    Some(RecordPage { records, total })
}

impl PageSource for DataGovClient {
    fn label(&self) -> &str {
        &self.label
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }

    async fn fetch_page(&self, offset: u64) -> Result<Option<RecordPage>, SourceError> {
        let query = self.query(offset);
        let body = retry::send_json(|| self.client.get(&self.endpoint).query(&query)).await?;
        Ok(extract_page(&body))
    }
}
