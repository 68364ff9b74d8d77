#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Run pipeline for one region: fetch, process, aggregate, enrich, export.
//!
//! A [`FetchRun`] owns every collection produced during a run. Each stage
//! runs to completion before the next starts, and only one upstream request
//! is in flight at a time. Per-page, per-station and per-file failures are
//! logged and never abort the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use air_quality_aggregate::summary::coverage_summary;
use air_quality_aggregate::{Aggregation, AggregationStats, aggregate_by_station, to_export_records};
use air_quality_export::{ExportError, ExportMetadata, default_filename, write_csv, write_json};
use air_quality_source::FetchOptions;
use air_quality_source::pagination::{PageSource, fetch_all};
use air_quality_source::process::process_record;
use air_quality_source::progress::{ProgressCallback, null_progress};
use air_quality_source::region_def::RegionDefinition;
use air_quality_station_models::{CoverageSummary, ExportRecord, FlatRecord, StationAggregate};
use air_quality_weather::{WeatherEnricher, WeatherObservation, enrich_stations, region_weather};
use chrono::{Local, NaiveDateTime};

/// Number of stations listed in the printed summary.
pub const TOP_STATIONS: usize = 5;

/// Settings for [`run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub fetch: FetchOptions,
    /// Pause between per-station weather lookups.
    pub station_delay: Duration,
    /// Directory receiving the export files.
    pub output_dir: PathBuf,
    pub csv: bool,
    pub json: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            station_delay: Duration::from_millis(500),
            output_dir: PathBuf::from("."),
            csv: true,
            json: true,
        }
    }
}

/// Progress sinks for the long-running stages.
pub struct RunProgress {
    pub fetch: Arc<dyn ProgressCallback>,
    pub weather: Arc<dyn ProgressCallback>,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self {
            fetch: null_progress(),
            weather: null_progress(),
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: CoverageSummary,
    pub stats: AggregationStats,
    /// Rows received upstream, including any beyond the cap.
    pub rows_received: u64,
    /// Stations that received weather columns.
    pub weather_enriched: usize,
    pub csv_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

/// State of one run over a region.
pub struct FetchRun<'a> {
    region: &'a RegionDefinition,
    raw: Vec<FlatRecord>,
    stations: Vec<StationAggregate>,
    records: Vec<ExportRecord>,
    region_weather: Option<WeatherObservation>,
    weather_source: Option<String>,
}

impl<'a> FetchRun<'a> {
    #[must_use]
    pub const fn new(region: &'a RegionDefinition) -> Self {
        Self {
            region,
            raw: Vec::new(),
            stations: Vec::new(),
            records: Vec::new(),
            region_weather: None,
            weather_source: None,
        }
    }

    /// Processed rows, one per upstream observation.
    #[must_use]
    pub fn raw(&self) -> &[FlatRecord] {
        &self.raw
    }

    /// Aggregated stations, in first-seen order.
    #[must_use]
    pub fn stations(&self) -> &[StationAggregate] {
        &self.stations
    }

    /// Flattened stations as they will be exported.
    #[must_use]
    pub fn records(&self) -> &[ExportRecord] {
        &self.records
    }

    /// Pages through `source` and processes every row received.
    ///
    /// Returns the number of rows received upstream.
    pub async fn fetch(
        &mut self,
        source: &impl PageSource,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> u64 {
        let outcome = fetch_all(source, options, progress).await;
        self.raw.extend(
            outcome
                .records
                .iter()
                .map(|record| process_record(record, self.region)),
        );

        progress.finish(format!(
            "Fetched {} records in {} pages",
            self.raw.len(),
            outcome.pages
        ));
        log::info!(
            "[{}] Total records fetched: {}",
            self.region.id(),
            self.raw.len()
        );
        outcome.rows_received
    }

    /// Folds the processed rows into stations.
    pub fn aggregate(&mut self) -> AggregationStats {
        let Aggregation { stations, stats } = aggregate_by_station(&self.raw);

        log::info!(
            "[{}] Aggregated {} records into {} stations with pollutant data",
            self.region.id(),
            self.raw.len(),
            stations.len()
        );
        if stats.stations_without_data > 0 {
            log::info!(
                "[{}] {} stations had no usable pollutant data",
                self.region.id(),
                stats.stations_without_data
            );
        }

        self.records = to_export_records(&stations);
        self.stations = stations;
        stats
    }

    /// Adds weather columns to every station and looks up region-wide
    /// conditions. Returns the number of stations enriched.
    pub async fn enrich(
        &mut self,
        enricher: &impl WeatherEnricher,
        delay: Duration,
        progress: &Arc<dyn ProgressCallback>,
    ) -> usize {
        if !enricher.is_enabled() {
            log::info!("Weather enrichment not configured, skipping");
            return 0;
        }

        let enriched = enrich_stations(enricher, &mut self.records, delay, progress).await;
        self.region_weather =
            region_weather(enricher, self.region.latitude, self.region.longitude).await;

        if enriched > 0 || self.region_weather.is_some() {
            self.weather_source = enricher.source_name().map(str::to_owned);
        }

        log::info!(
            "Weather added to {enriched} of {} stations",
            self.records.len()
        );
        enriched
    }

    /// Writes the CSV export. Failures are logged and yield `None`.
    #[must_use]
    pub fn save_csv(&self, path: &Path) -> Option<PathBuf> {
        match write_csv(path, &self.records) {
            Ok(_) => Some(path.to_path_buf()),
            Err(ExportError::NoData) => {
                log::warn!("No aggregated data to save");
                None
            }
            Err(e) => {
                log::error!("Error saving CSV to {}: {e}", path.display());
                None
            }
        }
    }

    /// Writes the JSON export. Failures are logged and yield `None`.
    #[must_use]
    pub fn save_json(&self, path: &Path, at: NaiveDateTime) -> Option<PathBuf> {
        let metadata = ExportMetadata::new(
            &self.records,
            &self.region.fetcher.source_url,
            self.weather_source.as_deref(),
            at,
        );

        match write_json(path, &self.records, &metadata, self.region_weather_entry()) {
            Ok(_) => Some(path.to_path_buf()),
            Err(ExportError::NoData) => {
                log::warn!("No aggregated data to save");
                None
            }
            Err(e) => {
                log::error!("Error saving JSON to {}: {e}", path.display());
                None
            }
        }
    }

    fn region_weather_entry(&self) -> Option<(String, serde_json::Value)> {
        let observation = self.region_weather.as_ref()?;
        Some((
            format!("{}_general_weather", self.region.id()),
            serde_json::Value::Object(observation.to_columns().into_iter().collect()),
        ))
    }

    /// Statistics over what the run has collected so far.
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        coverage_summary(&self.raw, &self.stations)
    }
}

/// Runs every stage for `region` and writes the exports into
/// `options.output_dir`.
///
/// Nothing is aggregated or written when no rows were fetched.
pub async fn run(
    region: &RegionDefinition,
    source: &impl PageSource,
    enricher: &impl WeatherEnricher,
    options: &RunOptions,
    progress: &RunProgress,
) -> RunReport {
    let mut fetch_run = FetchRun::new(region);

    let rows_received = fetch_run.fetch(source, &options.fetch, &progress.fetch).await;
    if fetch_run.raw().is_empty() {
        log::warn!("[{}] No data fetched", region.id());
        return RunReport {
            rows_received,
            ..RunReport::default()
        };
    }

    let stats = fetch_run.aggregate();
    let weather_enriched = fetch_run
        .enrich(enricher, options.station_delay, &progress.weather)
        .await;

    let at = Local::now().naive_local();
    let csv_path = options
        .csv
        .then(|| options.output_dir.join(default_filename(region.id(), "csv", at)))
        .and_then(|path| fetch_run.save_csv(&path));
    let json_path = options
        .json
        .then(|| options.output_dir.join(default_filename(region.id(), "json", at)))
        .and_then(|path| fetch_run.save_json(&path, at));

    RunReport {
        summary: fetch_run.summary(),
        stats,
        rows_received,
        weather_enriched,
        csv_path,
        json_path,
    }
}

/// Human-readable summary of a finished run.
#[must_use]
pub fn render_summary(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut lines = vec![
        "Clean data summary:".to_string(),
        format!("Stations with pollutant data: {}", summary.unique_stations),
        format!(
            "Pollutants found: {}",
            summary
                .pollutants_found
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        String::new(),
        "Top stations:".to_string(),
    ];

    lines.extend(
        summary
            .stations
            .iter()
            .take(TOP_STATIONS)
            .map(|s| format!("  - {} ({} pollutants)", s.name, s.pollutant_count)),
    );

    lines.push(String::new());
    lines.push("Coverage by pollutant:".to_string());
    lines.extend(
        summary
            .pollutant_coverage
            .iter()
            .map(|(label, count)| format!("  - {label}: {count} station measurements")),
    );

    if report.weather_enriched > 0 {
        lines.push(String::new());
        lines.push(format!(
            "Weather added to {} stations",
            report.weather_enriched
        ));
    }

    if report.csv_path.is_some() || report.json_path.is_some() {
        lines.push(String::new());
    }
    if let Some(path) = &report.csv_path {
        lines.push(format!("CSV saved: {}", path.display()));
    }
    if let Some(path) = &report.json_path {
        lines.push(format!("JSON saved: {}", path.display()));
    }

    lines.join("\n")
}
