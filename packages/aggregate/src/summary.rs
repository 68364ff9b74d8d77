//! Run statistics over raw and aggregated data.

use std::collections::{BTreeMap, BTreeSet};

use air_quality_station_models::{
    CoverageSummary, DateRange, FlatRecord, StationAggregate, StationSummary,
};

/// Summarizes a run. Reads its inputs only.
///
/// Pollutant labels are counted as received, before normalization and
/// allow-list filtering, so the summary can list pollutants that never
/// reach an aggregate. Rows with an empty label are not counted.
#[must_use]
pub fn coverage_summary(raw: &[FlatRecord], stations: &[StationAggregate]) -> CoverageSummary {
    let mut pollutant_coverage: BTreeMap<String, usize> = BTreeMap::new();
    for record in raw.iter().filter(|r| !r.pollutant_id.is_empty()) {
        *pollutant_coverage
            .entry(record.pollutant_id.clone())
            .or_default() += 1;
    }

    let fetch_dates = raw
        .iter()
        .map(|r| r.fetch_date.as_str())
        .filter(|d| !d.is_empty());
    let date_range = fetch_dates
        .clone()
        .min()
        .zip(fetch_dates.max())
        .map(|(earliest, latest)| DateRange {
            earliest: earliest.to_owned(),
            latest: latest.to_owned(),
        });

    CoverageSummary {
        raw_records: raw.len(),
        unique_stations: stations.len(),
        pollutants_found: pollutant_coverage.keys().cloned().collect(),
        pollutant_coverage,
        stations: stations
            .iter()
            .map(|s| StationSummary {
                name: s.station_name.clone(),
                lat: s.latitude,
                lon: s.longitude,
                pollutant_count: s.total_pollutants_monitored(),
            })
            .collect(),
        date_range,
        pollutants_available: stations
            .iter()
            .flat_map(|s| s.pollutants.keys().copied())
            .collect::<BTreeSet<_>>(),
    }
}

#[cfg(test)]
mod tests {
    use air_quality_pollutant_models::Pollutant;

    use super::*;
    use crate::aggregate_by_station;

    fn row(station: &str, pollutant: &str, avg: &str, fetch_date: &str) -> FlatRecord {
        FlatRecord {
            station_name: station.to_owned(),
            latitude: "28.6".to_owned(),
            longitude: "77.2".to_owned(),
            pollutant_id: pollutant.to_owned(),
            pollutant_avg: avg.to_owned(),
            fetch_date: fetch_date.to_owned(),
            ..FlatRecord::default()
        }
    }

    #[test]
    fn counts_raw_labels_before_filtering() {
        let raw = vec![
            row("A", "PM2.5", "55", "2025-11-03"),
            row("A", "Benzene", "5", "2025-11-03"),
            row("B", "PM2.5", "60", "2025-11-03"),
            row("B", "", "", "2025-11-03"),
        ];
        let stations = aggregate_by_station(&raw).stations;

        let summary = coverage_summary(&raw, &stations);

        assert_eq!(summary.raw_records, 4);
        assert_eq!(summary.unique_stations, 2);
        assert_eq!(
            summary.pollutants_found.iter().map(String::as_str).collect::<Vec<_>>(),
            ["Benzene", "PM2.5"]
        );
        assert_eq!(summary.pollutant_coverage["PM2.5"], 2);
        assert_eq!(summary.pollutant_coverage["Benzene"], 1);
        assert_eq!(
            summary.pollutants_available.into_iter().collect::<Vec<_>>(),
            [Pollutant::Pm25]
        );
    }

    #[test]
    fn lists_stations_with_counts() {
        let raw = vec![
            row("A", "PM2.5", "55", "2025-11-03"),
            row("A", "NO2", "20", "2025-11-03"),
        ];
        let stations = aggregate_by_station(&raw).stations;

        let summary = coverage_summary(&raw, &stations);

        assert_eq!(summary.stations.len(), 1);
        assert_eq!(summary.stations[0].name, "A");
        assert_eq!(summary.stations[0].lat, Some(28.6));
        assert_eq!(summary.stations[0].pollutant_count, 2);
    }

    #[test]
    fn date_range_spans_fetch_dates() {
        let raw = vec![
            row("A", "PM10", "1", "2025-11-04"),
            row("A", "PM10", "1", "2025-11-02"),
            row("A", "PM10", "1", ""),
        ];

        let summary = coverage_summary(&raw, &[]);

        let range = summary.date_range.unwrap();
        assert_eq!(range.earliest, "2025-11-02");
        assert_eq!(range.latest, "2025-11-04");
    }

    #[test]
    fn empty_run() {
        let summary = coverage_summary(&[], &[]);
        assert_eq!(summary, CoverageSummary::default());
    }
}
