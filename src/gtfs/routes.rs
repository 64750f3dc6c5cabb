//! `routes.txt` reader.
//!
//! Only the display name matters here; route patterns are rebuilt from
//! stop sequences by the schedule builder.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use super::LoadError;

/// Display data for one GTFS route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct Record {
    route_id: Option<String>,
    route_short_name: Option<String>,
    route_long_name: Option<String>,
}

pub fn load<R: Read>(reader: R, agency: &str) -> Result<(HashMap<String, String>, u64), LoadError> {
    let mut names = HashMap::new();
    let mut skipped = 0u64;

    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = match rec {
            Ok(rec) => rec,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let id = match rec.route_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let id = format!("{agency}:{id}");
        let name = rec
            .route_short_name
            .filter(|n| !n.is_empty())
            .or(rec.route_long_name.filter(|n| !n.is_empty()))
            .unwrap_or_else(|| id.clone());
        names.insert(id, name);
    }

    if skipped > 0 {
        warn!(agency, skipped, "skipped malformed route rows");
    }
    Ok((names, skipped))
}
