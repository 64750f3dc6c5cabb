//! GTFS table readers.
//!
//! One submodule per table, each parsing from any `impl Read` so the
//! schedule builder and tests can feed in-memory data. `load_dir` handles
//! the on-disk layout: a data directory is either a single feed (contains
//! `stops.txt`) or holds one subdirectory per agency. All ids are
//! namespaced `agency:id`, where the agency is the feed directory name.
//!
//! Rows missing mandatory fields or carrying unparsable values are skipped
//! and counted; only file-level I/O failures abort a load.

mod routes;
mod shapes;
mod stop_times;
mod stops;
mod transfers;
mod trips;

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use routes::RouteRecord;
pub use shapes::ShapePoint;
pub use stop_times::StopTimeRecord;
pub use stops::StopRecord;
pub use transfers::TransferRecord;
pub use trips::TripRecord;

/// CSV reader tolerant of the usual GTFS quirks: surrounding whitespace
/// and rows with missing trailing fields.
pub(crate) fn csv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Error from loading GTFS data.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no GTFS feed found under {0}")]
    NoFeeds(PathBuf),
}

/// Parsed GTFS tables for one or more feeds, before index construction.
#[derive(Debug, Default)]
pub struct RawTables {
    pub stops: Vec<StopRecord>,
    /// GTFS route id -> display name (short name, falling back to long).
    pub route_names: HashMap<String, String>,
    pub trips: Vec<TripRecord>,
    /// Trip id -> stop events ordered by stop_sequence.
    pub stop_times: HashMap<String, Vec<StopTimeRecord>>,
    /// Shape id -> polyline ordered by point sequence.
    pub shapes: HashMap<String, Vec<(f64, f64)>>,
    pub transfers: Vec<TransferRecord>,
    /// Rows skipped across all tables for missing or invalid fields.
    pub skipped_rows: u64,
}

/// Load every feed under `dir`.
pub fn load_dir(dir: &Path) -> Result<RawTables, LoadError> {
    let mut feeds = Vec::new();
    if dir.join("stops.txt").is_file() {
        feeds.push(dir.to_path_buf());
    } else {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() && path.join("stops.txt").is_file() {
                feeds.push(path);
            }
        }
        feeds.sort();
    }

    if feeds.is_empty() {
        return Err(LoadError::NoFeeds(dir.to_path_buf()));
    }

    let mut tables = RawTables::default();
    for feed in &feeds {
        let agency = feed
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "feed".to_string());
        info!(agency = %agency, path = %feed.display(), "reading GTFS feed");
        load_feed(feed, &agency, &mut tables)?;
    }

    info!(
        stops = tables.stops.len(),
        trips = tables.trips.len(),
        shapes = tables.shapes.len(),
        transfers = tables.transfers.len(),
        skipped_rows = tables.skipped_rows,
        "finished reading GTFS"
    );
    Ok(tables)
}

fn load_feed(feed: &Path, agency: &str, tables: &mut RawTables) -> Result<(), LoadError> {
    let (stops, skipped) = stops::load(File::open(feed.join("stops.txt"))?, agency)?;
    tables.stops.extend(stops);
    tables.skipped_rows += skipped;

    let (names, skipped) = routes::load(File::open(feed.join("routes.txt"))?, agency)?;
    tables.route_names.extend(names);
    tables.skipped_rows += skipped;

    let (trips, skipped) = trips::load(File::open(feed.join("trips.txt"))?, agency)?;
    tables.trips.extend(trips);
    tables.skipped_rows += skipped;

    let (stop_times, skipped) = stop_times::load(File::open(feed.join("stop_times.txt"))?, agency)?;
    tables.stop_times.extend(stop_times);
    tables.skipped_rows += skipped;

    // Shapes and transfers are optional tables.
    let shapes_path = feed.join("shapes.txt");
    if shapes_path.is_file() {
        let (shapes, skipped) = shapes::load(File::open(&shapes_path)?, agency)?;
        tables.shapes.extend(shapes);
        tables.skipped_rows += skipped;
    }

    let transfers_path = feed.join("transfers.txt");
    if transfers_path.is_file() {
        let (transfers, skipped) = transfers::load(File::open(&transfers_path)?, agency)?;
        tables.transfers.extend(transfers);
        tables.skipped_rows += skipped;
    } else {
        warn!(agency, "no transfers.txt, footpaths will be fully computed");
    }

    Ok(())
}
