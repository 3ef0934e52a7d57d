//! civic-tracker - command line front end for the report tracker

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use civic_core::{Category, ClusterRadius, IndexBand, Measurement, ReportQuery, ReportStatus};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use civic_tracker::{InMemoryReportStore, ReportService, TrackerConfig};

/// Citizen environmental report tracker
#[derive(Parser, Debug)]
#[command(name = "civic-tracker")]
#[command(about = "Track waste and water-quality reports, map clusters and pollutant indices")]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "CIVIC_CONFIG")]
    config: Option<PathBuf>,

    /// JSON array of reports to load into the store
    #[arg(long, env = "CIVIC_REPORTS")]
    reports: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the index for a pollutant concentration
    Index {
        #[arg(long, default_value = "pm2_5")]
        pollutant: String,
        concentration: f64,
    },
    /// Index a JSON array of measurements
    Ingest { measurements: PathBuf },
    /// Cluster stored reports for the map
    Clusters {
        #[arg(long)]
        category: Option<Category>,
        /// Ground radius in metres
        #[arg(long, conflicts_with = "zoom")]
        radius_m: Option<f64>,
        /// Screen radius in pixels (needs --zoom)
        #[arg(long, requires = "zoom")]
        pixels: Option<f64>,
        #[arg(long)]
        zoom: Option<u8>,
        /// Reference latitude for the pixel scale
        #[arg(long, default_value = "0.0")]
        lat: f64,
    },
    /// Dashboard summary
    Summary,
    /// Timeline of one report
    Track { id: Uuid },
    /// Search reports
    Search {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        status: Option<ReportStatus>,
        #[arg(long)]
        text: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::default(),
    };

    // Logs go to stderr; stdout carries command output
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("civic_tracker={},civic_core={},info", log_level, log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let store = match &args.reports {
        Some(path) => InMemoryReportStore::from_path(path)
            .await
            .with_context(|| format!("loading reports from {}", path.display()))?,
        None => InMemoryReportStore::new(),
    };
    info!(reports = store.len(), "Report store ready");
    let service = ReportService::new(Arc::new(store), &config);

    match args.command {
        Command::Index {
            pollutant,
            concentration,
        } => {
            let value = service.calculator().compute(&pollutant, concentration)?;
            println!("{} ({})", value, IndexBand::classify(value).label());
        }
        Command::Ingest { measurements } => {
            let json = tokio::fs::read_to_string(&measurements)
                .await
                .with_context(|| format!("reading {}", measurements.display()))?;
            let measurements: Vec<Measurement> = serde_json::from_str(&json)?;
            print_json(&service.ingest(&measurements))?;
        }
        Command::Clusters {
            category,
            radius_m,
            pixels,
            zoom,
            lat,
        } => {
            let radius = match (radius_m, zoom) {
                (Some(m), _) => Some(ClusterRadius::Meters(m)),
                (None, Some(zoom)) => Some(ClusterRadius::Pixels {
                    pixels: pixels.unwrap_or(config.clustering.default_pixel_radius),
                    zoom,
                    reference_latitude: lat,
                }),
                (None, None) => None,
            };
            print_json(&service.map_clusters(category, radius).await?)?;
        }
        Command::Summary => {
            print_json(&service.dashboard().await?)?;
        }
        Command::Track { id } => {
            print_json(&service.timeline(id).await?)?;
        }
        Command::Search {
            category,
            status,
            text,
        } => {
            let query = ReportQuery {
                category,
                status,
                text,
            };
            print_json(&service.search(&query).await?)?;
        }
    }

    Ok(())
}
