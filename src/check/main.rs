//! Coverage check CLI.
//!
//! Loads decoded map files (GeoJSON feature collections), then reports
//! whether a location falls inside the covered area.

use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use canopy::config::Config;
use canopy::geocode::{assess, CheckReport, GeocodedPoint};
use canopy::models::RawFeatureCollection;
use canopy::{Classifier, CoverageSession};

#[derive(Parser, Debug)]
#[command(name = "coverage")]
#[command(about = "Check whether a location is inside the network coverage area")]
struct Args {
    /// GeoJSON map file to load (repeatable, loaded in order)
    #[arg(short, long = "map", required = true)]
    maps: Vec<PathBuf>,

    /// Longitude of the location
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Latitude of the location
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Display label for the location
    #[arg(long, default_value = "query point")]
    label: String,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the point-site service radius (km)
    #[arg(long)]
    radius_km: Option<f64>,

    /// Write the normalized coverage map as GeoJSON to this path
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging level")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let classifier = match args.radius_km {
        Some(km) if !km.is_finite() || km < 0.0 => {
            anyhow::bail!("--radius-km must be a non-negative number, got {}", km)
        }
        Some(km) => Classifier::with_radius_km(km),
        None => config.classifier(),
    };

    let session = CoverageSession::new();
    for path in &args.maps {
        let collection = load_map(path)?;
        session.extend(&collection.features);
    }

    let features = session.snapshot();
    info!(
        "Checking ({}, {}) against {} features from {}",
        args.lon,
        args.lat,
        features.len(),
        features.source_files().join(", ")
    );

    if let Some(path) = &args.export {
        let geojson = serde_json::to_string(features.as_ref())?;
        fs::write(path, geojson)
            .with_context(|| format!("Failed to write coverage map {}", path.display()))?;
        info!("Exported {} features to {}", features.len(), path.display());
    }

    let location = GeocodedPoint::new(args.lon, args.lat, args.label);
    let outcome = with_quiet_panics(|| assess(Some(location), &features, &classifier));
    let report = CheckReport::new(outcome, &features);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Run `f` with panic messages sent to the debug log instead of stderr.
///
/// Strategy panics are caught and counted as a miss, so the default hook
/// would only print noise in the middle of the report.
fn with_quiet_panics<T>(f: impl FnOnce() -> T) -> T {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!("Caught panic during scan: {}", info)));
    let result = f();
    panic::set_hook(previous);
    result
}

/// Read one map file and tag its features with the file name
fn load_map(path: &Path) -> Result<RawFeatureCollection> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read map file {}", path.display()))?;
    let mut collection: RawFeatureCollection = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse map file {}", path.display()))?;

    let source_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    collection.tag_source(&source_file);

    info!(
        "Read {} features from {}",
        collection.features.len(),
        source_file
    );
    Ok(collection)
}
