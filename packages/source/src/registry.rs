//! Region registry: every region definition, loaded from embedded TOML.
//!
//! Each `.toml` file in `packages/source/regions/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::region_def::{RegionDefinition, parse_region_toml};

/// TOML configs embedded at compile time.
const REGION_TOMLS: &[(&str, &str)] = &[
    ("delhi", include_str!("../regions/delhi.toml")),
    ("mumbai", include_str!("../regions/mumbai.toml")),
];

/// Region used when none is requested.
pub const DEFAULT_REGION: &str = "delhi";

/// Returns all configured region definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// this is caught by the tests below).
#[must_use]
pub fn all_regions() -> Vec<RegionDefinition> {
    REGION_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_region_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a region by ID.
#[must_use]
pub fn find_region(id: &str) -> Option<RegionDefinition> {
    all_regions().into_iter().find(|r| r.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_regions() {
        assert_eq!(all_regions().len(), REGION_TOMLS.len());
    }

    #[test]
    fn region_ids_match_file_names() {
        for ((name, _), region) in REGION_TOMLS.iter().zip(all_regions()) {
            assert_eq!(*name, region.id);
        }
    }

    #[test]
    fn default_region_exists() {
        let delhi = find_region(DEFAULT_REGION).unwrap();
        assert_eq!(delhi.city, "Delhi");
        assert_eq!(delhi.country, "India");
        assert_eq!(delhi.fetcher.filters.get("state").map(String::as_str), Some("Delhi"));
        assert_eq!(delhi.fetcher.page_size, 100);
    }

    #[test]
    fn unknown_region_is_none() {
        assert!(find_region("atlantis").is_none());
    }
}
