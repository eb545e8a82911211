//! Plans a multi-day trip from a JSON request and prints the JSON response.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trip_planner::catalog::InMemoryCatalog;
use trip_planner::config::PlannerConfig;
use trip_planner::elevation::EstimatedElevation;
use trip_planner::events::TracingSink;
use trip_planner::haversine::{HaversineMatrix, StraightLineRouter};
use trip_planner::osrm::{OsrmClient, OsrmConfig};
use trip_planner::{PlanInput, PlanResponse, TripPlanner};

/// Order segments into day routes under daily distance/elevation caps
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Plan request (JSON)
    #[arg(long)]
    input: PathBuf,

    /// Segment catalog: JSON array of segment metadata
    #[arg(long)]
    segments: PathBuf,

    /// OSRM base URL
    #[arg(long, default_value = "http://localhost:5000")]
    osrm_url: String,

    /// OSRM profile
    #[arg(long, default_value = "bike")]
    profile: String,

    /// Use straight-line costs and transfers instead of OSRM
    #[arg(long)]
    offline: bool,

    /// Pretty-print the response
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trip_planner=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = PlannerConfig::from_env();

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let input: PlanInput = serde_json::from_str(&raw).context("parsing plan request")?;
    let catalog = InMemoryCatalog::from_json_file(&args.segments)
        .with_context(|| format!("loading {}", args.segments.display()))?;
    tracing::info!(segments = catalog.len(), "catalog loaded");

    let response = if args.offline {
        let matrix = HaversineMatrix::new(config.leg_speed_kmh);
        TripPlanner::new(catalog, matrix, StraightLineRouter, EstimatedElevation)
            .with_config(config)
            .with_sink(Arc::new(TracingSink))
            .plan_trip(&input)?
    } else {
        let osrm = OsrmClient::new(OsrmConfig {
            base_url: args.osrm_url,
            profile: args.profile,
            ..OsrmConfig::default()
        })?;
        TripPlanner::new(catalog, osrm.clone(), osrm, EstimatedElevation)
            .with_config(config)
            .plan_trip(&input)?
    };

    print_response(&response, args.pretty)?;
    if !response.is_ok() {
        std::process::exit(2);
    }
    Ok(())
}

fn print_response(response: &PlanResponse, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    println!("{json}");
    Ok(())
}
