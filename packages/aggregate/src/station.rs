//! Grouping of flat rows into per-station aggregates.

use std::collections::{BTreeMap, HashMap};

use air_quality_pollutant_models::{Pollutant, normalize_pollutant_name};
use air_quality_station_models::{FlatRecord, StationAggregate, StationKey};

use crate::observation::parse_observation;

/// Counters describing what the aggregator did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Rows seen.
    pub rows: usize,
    /// Rows without a pollutant label or average.
    pub skipped_incomplete: usize,
    /// Observations of pollutants outside the allow-list.
    pub unsupported_pollutant: usize,
    /// Observations rejected by numeric parsing.
    pub invalid_numeric: usize,
    /// Observations that replaced an earlier one for the same station and
    /// pollutant.
    pub overwritten: usize,
    /// Stations dropped because no pollutant survived.
    pub stations_without_data: usize,
}

/// Output of [`StationAggregator::finish`].
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// One entry per station with at least one pollutant, in first-seen
    /// order.
    pub stations: Vec<StationAggregate>,
    pub stats: AggregationStats,
}

/// Incrementally folds [`FlatRecord`]s into [`StationAggregate`]s.
///
/// Stations keep the position of the first row that mentioned them, even
/// if that row's observation was later dropped.
#[derive(Debug, Default)]
pub struct StationAggregator {
    stations: Vec<StationAggregate>,
    index: HashMap<StationKey, usize>,
    stats: AggregationStats,
}

impl StationAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one row into its station.
    pub fn push(&mut self, record: &FlatRecord) {
        self.stats.rows += 1;

        if record.pollutant_id.is_empty() || record.pollutant_avg.is_empty() {
            self.stats.skipped_incomplete += 1;
            return;
        }

        let slot = self.station_slot(record);

        let key = normalize_pollutant_name(&record.pollutant_id);
        let Some(pollutant) = Pollutant::from_key(&key) else {
            log::trace!(
                "{}: ignoring unsupported pollutant {:?}",
                record.station_name,
                record.pollutant_id
            );
            self.stats.unsupported_pollutant += 1;
            return;
        };

        let measurement = match parse_observation(
            &record.pollutant_min,
            &record.pollutant_max,
            &record.pollutant_avg,
            &record.pollutant_unit,
        ) {
            Ok(measurement) => measurement,
            Err(e) => {
                log::debug!("{}: dropping {pollutant} observation: {e}", record.station_name);
                self.stats.invalid_numeric += 1;
                return;
            }
        };

        if self.stations[slot]
            .pollutants
            .insert(pollutant, measurement)
            .is_some()
        {
            log::debug!(
                "{}: later {pollutant} observation replaces earlier one",
                record.station_name
            );
            self.stats.overwritten += 1;
        }
    }

    /// Returns the index of the row's station, creating it on first sight.
    fn station_slot(&mut self, record: &FlatRecord) -> usize {
        let key = StationKey::from(record);
        if let Some(&slot) = self.index.get(&key) {
            return slot;
        }

        let slot = self.stations.len();
        self.stations.push(StationAggregate {
            station_name: record.station_name.trim().to_owned(),
            city: record.city.trim().to_owned(),
            state: record.state.trim().to_owned(),
            latitude: parse_coordinate(&record.latitude),
            longitude: parse_coordinate(&record.longitude),
            last_update: record.last_update.trim().to_owned(),
            pollutants: BTreeMap::new(),
        });
        self.index.insert(key, slot);
        slot
    }

    /// Drops stations without pollutant data and returns the rest.
    #[must_use]
    pub fn finish(self) -> Aggregation {
        let mut stats = self.stats;
        let seen = self.stations.len();

        let stations: Vec<StationAggregate> = self
            .stations
            .into_iter()
            .filter(|s| !s.pollutants.is_empty())
            .collect();
        stats.stations_without_data = seen - stations.len();

        log::debug!("Aggregation stats: {stats:?}");

        Aggregation { stations, stats }
    }
}

/// Aggregates a batch of rows in input order.
#[must_use]
pub fn aggregate_by_station(records: &[FlatRecord]) -> Aggregation {
    let mut aggregator = StationAggregator::new();
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}

/// Parses a coordinate. Empty or invalid text is `None`.
fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(station: &str, pollutant: &str, min: &str, max: &str, avg: &str) -> FlatRecord {
        FlatRecord {
            station_name: station.to_owned(),
            city: "Delhi".to_owned(),
            state: "Delhi".to_owned(),
            latitude: "1.0".to_owned(),
            longitude: "2.0".to_owned(),
            pollutant_id: pollutant.to_owned(),
            pollutant_min: min.to_owned(),
            pollutant_max: max.to_owned(),
            pollutant_avg: avg.to_owned(),
            pollutant_unit: "µg/m³".to_owned(),
            ..FlatRecord::default()
        }
    }

    #[test]
    fn single_pm25_row_round_trips() {
        let result = aggregate_by_station(&[row("A", "PM2.5", "40", "70", "55")]);

        assert_eq!(result.stations.len(), 1);
        let station = &result.stations[0];
        assert_eq!(station.station_name, "A");
        assert_eq!(station.latitude, Some(1.0));
        assert_eq!(station.longitude, Some(2.0));
        assert_eq!(station.total_pollutants_monitored(), 1);

        let pm25 = &station.pollutants[&Pollutant::Pm25];
        assert_eq!(pm25.min, Some(40.0));
        assert_eq!(pm25.max, Some(70.0));
        assert!((pm25.avg - 55.0).abs() < f64::EPSILON);
        assert_eq!(pm25.unit, "µg/m³");
    }

    #[test]
    fn rows_for_one_station_merge() {
        let result = aggregate_by_station(&[
            row("A", "PM2.5", "40", "70", "55"),
            row("A", "NO2", "10", "30", "20"),
            row("A", "Ozone", "", "", "33"),
        ]);

        assert_eq!(result.stations.len(), 1);
        let pollutants: Vec<Pollutant> = result.stations[0].pollutants.keys().copied().collect();
        assert_eq!(pollutants, [Pollutant::Pm25, Pollutant::O3, Pollutant::No2]);
    }

    #[test]
    fn unsupported_only_station_is_excluded() {
        let result = aggregate_by_station(&[row("B", "Benzene", "", "", "5")]);

        assert!(result.stations.is_empty());
        assert_eq!(result.stats.unsupported_pollutant, 1);
        assert_eq!(result.stats.stations_without_data, 1);
    }

    #[test]
    fn non_numeric_only_station_is_excluded() {
        let result = aggregate_by_station(&[row("C", "NO2", "", "", "abc")]);

        assert!(result.stations.is_empty());
        assert_eq!(result.stats.invalid_numeric, 1);
    }

    #[test]
    fn rows_without_label_or_average_create_no_station() {
        let result = aggregate_by_station(&[
            row("D", "", "1", "2", "3"),
            row("D", "PM10", "1", "2", ""),
        ]);

        assert!(result.stations.is_empty());
        assert_eq!(result.stats.skipped_incomplete, 2);
        assert_eq!(result.stats.stations_without_data, 0);
    }

    #[test]
    fn last_write_wins() {
        let result = aggregate_by_station(&[
            row("A", "SO2", "1", "9", "5"),
            row("A", "SO2", "", "12", "8"),
        ]);

        let so2 = &result.stations[0].pollutants[&Pollutant::So2];
        assert_eq!(so2.min, None);
        assert_eq!(so2.max, Some(12.0));
        assert!((so2.avg - 8.0).abs() < f64::EPSILON);
        assert_eq!(result.stats.overwritten, 1);
    }

    #[test]
    fn invalid_repeat_does_not_erase_earlier_value() {
        let result = aggregate_by_station(&[
            row("A", "CO", "", "", "1.2"),
            row("A", "CO", "", "", "NA"),
        ]);

        let co = &result.stations[0].pollutants[&Pollutant::Co];
        assert!((co.avg - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn same_name_different_coordinates_are_distinct() {
        let mut moved = row("A", "PM10", "", "", "100");
        moved.latitude = "1.5".to_owned();

        let result = aggregate_by_station(&[row("A", "PM10", "", "", "90"), moved]);

        assert_eq!(result.stations.len(), 2);
        assert_eq!(result.stations[1].latitude, Some(1.5));
    }

    #[test]
    fn first_seen_order_is_kept() {
        let result = aggregate_by_station(&[
            row("Z", "Lead", "", "", "1"),
            row("M", "PM10", "", "", "1"),
            row("Z", "PM10", "", "", "2"),
        ]);

        let names: Vec<&str> = result
            .stations
            .iter()
            .map(|s| s.station_name.as_str())
            .collect();
        assert_eq!(names, ["Z", "M"]);
    }

    #[test]
    fn shell_fields_are_trimmed_and_coordinates_lenient() {
        let mut record = row("  Lodhi Road  ", "NH3", "", "", "7");
        record.city = " Delhi ".to_owned();
        record.latitude = String::new();
        record.longitude = "east".to_owned();
        record.last_update = " 03-11-2025 13:00:00 ".to_owned();

        let result = aggregate_by_station(&[record]);
        let station = &result.stations[0];

        assert_eq!(station.station_name, "Lodhi Road");
        assert_eq!(station.city, "Delhi");
        assert_eq!(station.latitude, None);
        assert_eq!(station.longitude, None);
        assert_eq!(station.last_update, "03-11-2025 13:00:00");
    }

    #[test]
    fn total_matches_distinct_pollutants() {
        let rows: Vec<FlatRecord> = ["PM2.5", "PM10", "O3", "NO2", "SO2", "CO", "NH3", "Pb"]
            .iter()
            .chain(["PM2.5", "NO2"].iter())
            .map(|p| row("A", p, "", "", "1"))
            .collect();

        let result = aggregate_by_station(&rows);
        let station = &result.stations[0];

        assert_eq!(station.total_pollutants_monitored(), 7);
        assert_eq!(station.pollutants.len(), 7);
        assert_eq!(result.stats.rows, 10);
        assert_eq!(result.stats.overwritten, 2);
    }
}
