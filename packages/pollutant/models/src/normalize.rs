//! Pollutant label normalization.
//!
//! Maps vendor pollutant labels to canonical keys. Known spellings go
//! through an explicit synonym table; anything else falls back to a
//! lowercase, underscore-separated form.

/// Vendor label to canonical key. Lookups are case-sensitive.
const SYNONYMS: &[(&str, &str)] = &[
    ("PM2.5", "pm25"),
    ("PM10", "pm10"),
    ("O3", "o3"),
    ("Ozone", "o3"),
    ("NO2", "no2"),
    ("SO2", "so2"),
    ("CO", "co"),
    ("NH3", "nh3"),
    ("Ammonia", "nh3"),
    ("Pb", "pb"),
    ("Lead", "pb"),
    ("Benzene", "benzene"),
    ("Toluene", "toluene"),
    ("Xylene", "xylene"),
    ("MP-Xylene", "mp_xylene"),
    ("Eth-Benzene", "eth_benzene"),
];

/// Maps a raw pollutant label to its canonical key.
///
/// Labels in the synonym table map exactly. Unknown labels are lowercased
/// with hyphens and spaces replaced by underscores, which is best-effort and
/// not guaranteed collision-free. Never fails.
#[must_use]
pub fn normalize_pollutant_name(label: &str) -> String {
    SYNONYMS
        .iter()
        .find(|(raw, _)| *raw == label)
        .map_or_else(
            || label.to_lowercase().replace(['-', ' '], "_"),
            |(_, key)| (*key).to_owned(),
        )
}
