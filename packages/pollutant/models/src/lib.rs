#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pollutant taxonomy for air-quality station data.
//!
//! Upstream feeds label pollutants with free-text vendor strings
//! (`"PM2.5"`, `"Ozone"`, `"NH3"`, ...). [`normalize_pollutant_name`] maps
//! those labels to canonical lowercase keys, and [`Pollutant`] is the fixed
//! allow-list of keys that are surfaced in station aggregates. Everything
//! else is ingested but never reported.

pub mod normalize;

pub use normalize::normalize_pollutant_name;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Unit assumed when the upstream record does not report one.
pub const DEFAULT_UNIT: &str = "µg/m³";

/// A pollutant on the reporting allow-list.
///
/// The string form (via [`AsRef<str>`], [`Display`](std::fmt::Display) and
/// serde) is the canonical key used for export column prefixes, e.g.
/// `pm25_avg`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Pollutant {
    /// Fine particulate matter, diameter <= 2.5 µm
    Pm25,
    /// Coarse particulate matter, diameter <= 10 µm
    Pm10,
    /// Ozone
    O3,
    /// Nitrogen dioxide
    No2,
    /// Sulphur dioxide
    So2,
    /// Carbon monoxide
    Co,
    /// Ammonia
    Nh3,
}

impl Pollutant {
    /// Every pollutant on the allow-list, in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pm25,
            Self::Pm10,
            Self::O3,
            Self::No2,
            Self::So2,
            Self::Co,
            Self::Nh3,
        ]
    }

    /// Looks up an allow-listed pollutant by canonical key (e.g. `"no2"`).
    ///
    /// Returns `None` for keys that are valid pollutants but not reported
    /// on (e.g. `"benzene"`).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }

    /// Normalizes a raw vendor label and looks it up on the allow-list.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::from_key(&normalize_pollutant_name(label))
    }

    /// Upper-case label used in human-facing summaries (e.g. `"PM25"`).
    #[must_use]
    pub fn label(self) -> String {
        self.as_ref().to_uppercase()
    }

    /// Name of the export column for the given measurement field
    /// (`"min"`, `"max"`, `"avg"` or `"unit"`).
    #[must_use]
    pub fn column(self, field: &str) -> String {
        format!("{}_{field}", self.as_ref())
    }
}
