//! `trips.txt` reader.

use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use super::LoadError;

/// A parsed trip row.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub id: String,
    pub route_id: String,
    pub shape_id: Option<String>,
}

#[derive(Deserialize)]
struct Record {
    trip_id: Option<String>,
    route_id: Option<String>,
    shape_id: Option<String>,
}

pub fn load<R: Read>(reader: R, agency: &str) -> Result<(Vec<TripRecord>, u64), LoadError> {
    let mut trips = Vec::new();
    let mut skipped = 0u64;

    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = match rec {
            Ok(rec) => rec,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let (id, route_id) = match (rec.trip_id, rec.route_id) {
            (Some(id), Some(route_id)) if !id.is_empty() && !route_id.is_empty() => {
                (id, route_id)
            }
            _ => {
                skipped += 1;
                continue;
            }
        };
        trips.push(TripRecord {
            id: format!("{agency}:{id}"),
            route_id: format!("{agency}:{route_id}"),
            shape_id: rec
                .shape_id
                .filter(|s| !s.is_empty())
                .map(|s| format!("{agency}:{s}")),
        });
    }

    if skipped > 0 {
        warn!(agency, skipped, "skipped malformed trip rows");
    }
    Ok((trips, skipped))
}
