use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use gapscan::points::load_points;
use gapscan::scan::DEFAULT_MAX_CELLS;
use gapscan::{scan, scan_par, ErrorReport, GapReport, GeoPoint, NearbyGapsRequest, RequestError};

#[derive(Parser, Debug)]
#[command(name = "gaps_json")]
#[command(about = "Answer a nearby-gaps JSON request against a CSV of existing points.", long_about = None)]
struct Cli {
    /// Path to the JSON request body. Reads stdin when omitted or "-".
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// CSV of existing points (header with latitude,longitude)
    #[arg(short, long)]
    points: Option<PathBuf>,

    /// Refuse scans whose grid would hold more cells than this
    #[arg(long, default_value_t = DEFAULT_MAX_CELLS)]
    max_cells: u64,

    /// Classify grid rows on all cores
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Pretty-print the response
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn read_body(path: Option<&PathBuf>) -> Result<String> {
    let mut body = String::new();
    match path {
        Some(path) if path.as_os_str() != "-" => {
            body = std::fs::read_to_string(path)
                .with_context(|| format!("reading request {}", path.display()))?;
        }
        _ => {
            std::io::stdin()
                .read_to_string(&mut body)
                .context("reading request from stdin")?;
        }
    }
    Ok(body)
}

fn answer(
    body: &str,
    existing: &[GeoPoint],
    max_cells: u64,
    parallel: bool,
) -> Result<GapReport, RequestError> {
    let request =
        NearbyGapsRequest::from_json(body)?.to_scan_request_with_max_cells(max_cells)?;
    let result = if parallel {
        scan_par(&request, existing)?
    } else {
        scan(&request, existing)?
    };
    Ok(GapReport::new(&request, &result))
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let body = read_body(cli.request.as_ref())?;
    let existing = match &cli.points {
        Some(path) => load_points(path).with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };

    match answer(&body, &existing, cli.max_cells, cli.parallel) {
        Ok(report) => {
            println!("{}", to_json(&report, cli.pretty)?);
            Ok(())
        }
        Err(err) => {
            warn!("Rejected request: {err}");
            println!("{}", to_json(&ErrorReport::new(&err), cli.pretty)?);
            std::process::exit(1);
        }
    }
}
