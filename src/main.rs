//! City weather CLI - resolve a city to a weather snapshot
//!
//! Prints a one-line summary, or the full snapshot as JSON with `--json`.
//! Logs go to stderr; control them with `RUST_LOG`.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cityweather::cache::{FileSnapshotStore, MemorySnapshotStore, SnapshotCache};
use cityweather::cli::Cli;
use cityweather::config::WeatherConfig;
use cityweather::data::WeatherSnapshot;
use cityweather::service::WeatherService;

/// Installs the stderr log subscriber, defaulting to warnings only
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Picks the on-disk cache unless memory was requested or no cache dir exists
fn build_cache(memory_only: bool) -> Arc<dyn SnapshotCache> {
    if !memory_only {
        if let Some(store) = FileSnapshotStore::new() {
            return Arc::new(store);
        }
        tracing::warn!("no user cache directory available, caching in memory");
    }
    Arc::new(MemorySnapshotStore::new())
}

fn summary_line(snapshot: &WeatherSnapshot) -> String {
    let place = snapshot
        .geocode
        .as_ref()
        .map(|g| match &g.admin1 {
            Some(admin1) if admin1 != &g.name => format!("{}, {}", g.name, admin1),
            _ => g.name.clone(),
        })
        .unwrap_or_else(|| snapshot.normalized_city.clone());

    format!(
        "{}: {} {:.1}°C {}% humidity (source: {}, cache: {})",
        place,
        snapshot.condition.label(),
        snapshot.temperature_c,
        snapshot.humidity,
        snapshot.source.label(),
        snapshot.cache_status.label(),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let config = match cli.apply_to(WeatherConfig::from_env()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let service = WeatherService::with_open_meteo(build_cache(cli.memory_cache), config);
    let city = cli.city_arg();
    let snapshot = service.get_weather_by_city(city.as_deref()).await;

    if cli.json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to encode snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", summary_line(&snapshot));
    }

    ExitCode::SUCCESS
}
