#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Air-quality station data source.
//!
//! Regions are described by embedded TOML configs ([`registry`]). For a
//! region, [`data_gov::DataGovClient`] fetches pages of raw station rows,
//! [`pagination::fetch_all`] drives the bounded pagination loop and
//! [`process::process_record`] turns each raw row into a
//! [`FlatRecord`](air_quality_station_models::FlatRecord) ready for
//! aggregation.

pub mod data_gov;
pub mod pagination;
pub mod process;
pub mod progress;
pub mod region_def;
pub mod registry;
pub mod retry;

use std::time::Duration;

/// Errors that can occur while talking to the upstream station API.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        /// Status code returned by the server.
        status: reqwest::StatusCode,
    },

    /// A region definition is invalid.
    #[error("Invalid region config: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Default cap on the number of raw rows fetched in one run.
pub const DEFAULT_MAX_RECORDS: u64 = 10_000;

/// Options controlling one pagination run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Hard cap on rows ingested. Pagination stops as soon as it is reached,
    /// even in the middle of a page.
    pub max_records: u64,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            page_delay: Duration::from_secs(1),
        }
    }
}
