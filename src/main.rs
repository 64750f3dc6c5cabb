//! Command-line query tool.
//!
//! Loads a GTFS directory without a time-window filter and answers one
//! journey query, printing the wire-format legs as JSON. The hosting
//! service drives the same engine through `LifecycleManager` and
//! `Orchestrator` instead.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use transit_server::footpath::FootpathConfig;
use transit_server::gtfs;
use transit_server::raptor::{Orchestrator, SearchConfig};
use transit_server::schedule::{self, TimeWindow};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "transit_server=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let [_, data_dir, source, target, earliest_dep] = args.as_slice() else {
        eprintln!("usage: transit-server <gtfs-dir> <source-stop-id> <target-stop-id> <HH:MM:SS>");
        return ExitCode::FAILURE;
    };

    let tables = match gtfs::load_dir(std::path::Path::new(data_dir)) {
        Ok(tables) => tables,
        Err(error) => {
            eprintln!("failed to load GTFS from {data_dir}: {error}");
            return ExitCode::FAILURE;
        }
    };
    let (index, _stats) = schedule::build(
        &tables,
        TimeWindow::unbounded(),
        &FootpathConfig::default(),
    );
    info!(
        stops = index.num_stops(),
        routes = index.num_routes(),
        trips = index.num_trips(),
        "index ready"
    );

    let orchestrator = Orchestrator::new(Arc::new(index), SearchConfig::default());
    match orchestrator.find_journeys(source, target, earliest_dep).await {
        Ok(journeys) => {
            match serde_json::to_string_pretty(&journeys) {
                Ok(json) => println!("{json}"),
                Err(error) => {
                    eprintln!("failed to render journeys: {error}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("query failed: {error}");
            ExitCode::FAILURE
        }
    }
}
