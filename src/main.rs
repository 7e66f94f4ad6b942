use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use csv::Writer;
use log::info;

use gapscan::points::{load_records, nearest_record, PointRecord};
use gapscan::report::GapEntry;
use gapscan::scan::{
    DEFAULT_GRID_RESOLUTION_M, DEFAULT_MAX_CELLS, DEFAULT_RADIUS_M, DEFAULT_THRESHOLD_M,
};
use gapscan::{scan, scan_par, GeoPoint, ScanRequest};

#[derive(Parser, Debug)]
#[command(name = "gaps")]
#[command(about = "Find unclaimed grid cells around a coordinate, ranked by distance.", long_about = None)]
struct Cli {
    /// Latitude of the center, in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude of the center, in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// CSV of existing points (header with latitude,longitude). If omitted, no point is claimed.
    #[arg(short, long)]
    points: Option<PathBuf>,

    /// Scan radius in meters
    #[arg(short, long, default_value_t = DEFAULT_RADIUS_M)]
    radius: f64,

    /// Minimum clearance in meters from every existing point
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD_M)]
    threshold: f64,

    /// Spacing between candidate cells in meters
    #[arg(short, long, default_value_t = DEFAULT_GRID_RESOLUTION_M)]
    grid_resolution: f64,

    /// Refuse scans whose grid would hold more cells than this
    #[arg(long, default_value_t = DEFAULT_MAX_CELLS)]
    max_cells: u64,

    /// Classify grid rows on all cores
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Output CSV (latitude, longitude, distance_m). If omitted, prints a summary to stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Number of gaps listed in the stdout summary
    #[arg(long, default_value_t = 10)]
    show: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let records: Vec<PointRecord> = match &cli.points {
        Some(path) => load_records(path).with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };
    let existing: Vec<GeoPoint> = records.iter().map(PointRecord::location).collect();

    let request = ScanRequest::new(GeoPoint::new(cli.lat, cli.lon))
        .with_radius(cli.radius)
        .with_threshold(cli.threshold)
        .with_grid_resolution(cli.grid_resolution)
        .with_max_cells(cli.max_cells);

    let now = Instant::now();
    let result = if cli.parallel {
        scan_par(&request, &existing)
    } else {
        scan(&request, &existing)
    }
    .context("scanning for gaps")?;
    info!(
        "Scanned {} cells in {:.3} s",
        result.cells_scanned(),
        now.elapsed().as_secs_f64()
    );

    let entries: Vec<GapEntry> = result.nearby().iter().map(GapEntry::from).collect();

    if let Some(out_path) = cli.out {
        let mut wtr = Writer::from_path(&out_path)
            .with_context(|| format!("creating CSV {}", out_path.display()))?;
        wtr.write_record(["latitude", "longitude", "distance_m"])?;
        for entry in &entries {
            wtr.write_record(&[
                format!("{:.6}", entry.latitude),
                format!("{:.6}", entry.longitude),
                format!("{:.2}", entry.distance),
            ])?;
        }
        wtr.flush()?;
        println!("Wrote {} gaps to {}", entries.len(), out_path.display());
    } else {
        println!("Cells scanned: {}", result.cells_scanned());
        println!("Cells within {} m: {}", cli.radius, result.cells_in_radius());
        println!("Gaps: {}", entries.len());
        match entries.first() {
            Some(nearest) => println!(
                "Nearest gap: ({:.6}, {:.6}) at {:.2} m",
                nearest.latitude, nearest.longitude, nearest.distance
            ),
            None => println!("Nearest gap: none"),
        }
        if let Some((record, distance)) = nearest_record(&records, &request.center) {
            println!("Closest existing point: {} at {:.2} m", record.label(), distance);
        }
        for entry in entries.iter().skip(1).take(cli.show.saturating_sub(1)) {
            println!(
                "  ({:.6}, {:.6}) at {:.2} m",
                entry.latitude, entry.longitude, entry.distance
            );
        }
    }

    Ok(())
}
