#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the air-quality station fetcher.

use std::path::PathBuf;
use std::process::ExitCode;

use air_quality_cli_utils::{IndicatifProgress, MultiProgress, init_logger};
use air_quality_fetch::{RunOptions, RunProgress, render_summary, run};
use air_quality_source::FetchOptions;
use air_quality_source::data_gov::DataGovClient;
use air_quality_source::progress::null_progress;
use air_quality_source::registry::{DEFAULT_REGION, all_regions, find_region};
use air_quality_weather::NullEnricher;
use air_quality_weather::openweather::{OpenWeatherClient, WeatherConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "air_quality_fetch", about = "Real-time air-quality station fetcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, aggregate and export current station readings for a region
    Fetch {
        /// Region identifier (see `regions`)
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
        /// data.gov.in API key
        #[arg(long, env = "DATA_GOV_API_KEY", hide_env_values = true)]
        api_key: String,
        /// `OpenWeatherMap` API key. Weather enrichment is skipped without it.
        #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
        weather_api_key: Option<String>,
        /// Maximum number of upstream records to fetch
        #[arg(long, default_value = "5000")]
        max_records: u64,
        /// Directory to write the CSV and JSON files into
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Do not write the CSV file
        #[arg(long)]
        skip_csv: bool,
        /// Do not write the JSON file
        #[arg(long)]
        skip_json: bool,
    },
    /// List all configured regions
    Regions,
}

#[tokio::main]
async fn main() -> ExitCode {
    let multi = init_logger();
    let cli = Cli::parse();

    match execute(cli.command, &multi).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("Error in main execution: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(
    command: Commands,
    multi: &MultiProgress,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Regions => {
            println!("{:<12} NAME", "ID");
            println!("{}", "-".repeat(40));
            for region in all_regions() {
                println!("{:<12} {}", region.id(), region.name());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fetch {
            region,
            api_key,
            weather_api_key,
            max_records,
            output_dir,
            skip_csv,
            skip_json,
        } => {
            let region = find_region(&region).ok_or_else(|| {
                format!(
                    "Unknown region: {region} (available: {})",
                    all_regions()
                        .iter()
                        .map(|r| r.id().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })?;
            std::fs::create_dir_all(&output_dir)?;

            let source = DataGovClient::new(&region, &api_key)?;
            let weather_config = WeatherConfig::default();
            let options = RunOptions {
                fetch: FetchOptions {
                    max_records,
                    page_delay: region.page_delay(),
                },
                station_delay: weather_config.station_delay,
                output_dir,
                csv: !skip_csv,
                json: !skip_json,
            };
            let fetch_progress =
                IndicatifProgress::fetch_bar(multi, &format!("Fetching {} stations", region.name()));

            log::info!(
                "Fetching {} air quality data (each upstream record is one pollutant at one station)",
                region.name()
            );

            let report = match weather_api_key.filter(|key| !key.is_empty()) {
                Some(key) => {
                    let client = OpenWeatherClient::new(&key, weather_config)?;
                    let progress = RunProgress {
                        fetch: fetch_progress,
                        weather: IndicatifProgress::stations_bar(multi, "Fetching weather"),
                    };
                    run(&region, &source, &client, &options, &progress).await
                }
                None => {
                    log::info!("OPENWEATHER_API_KEY not set, skipping weather enrichment");
                    let progress = RunProgress {
                        fetch: fetch_progress,
                        weather: null_progress(),
                    };
                    run(&region, &source, &NullEnricher, &options, &progress).await
                }
            };

            if report.summary.raw_records == 0 {
                eprintln!("No data fetched. Check your API key and network connection.");
                return Ok(ExitCode::FAILURE);
            }

            println!("\n{}", render_summary(&report));
            Ok(ExitCode::SUCCESS)
        }
    }
}
