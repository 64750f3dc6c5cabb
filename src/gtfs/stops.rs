//! `stops.txt` reader.

use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use super::LoadError;

/// A parsed stop row, id namespaced with its agency.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    pub agency: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
struct Record {
    stop_id: Option<String>,
    stop_name: Option<String>,
    stop_lat: Option<String>,
    stop_lon: Option<String>,
}

pub fn load<R: Read>(reader: R, agency: &str) -> Result<(Vec<StopRecord>, u64), LoadError> {
    let mut stops = Vec::new();
    let mut skipped = 0u64;

    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = match rec {
            Ok(rec) => rec,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let (id, name, lat, lon) = match (rec.stop_id, rec.stop_name, rec.stop_lat, rec.stop_lon)
        {
            (Some(id), Some(name), Some(lat), Some(lon)) if !id.is_empty() => {
                match (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
                    (Ok(lat), Ok(lon)) => (id, name, lat, lon),
                    _ => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            _ => {
                skipped += 1;
                continue;
            }
        };
        stops.push(StopRecord {
            id: format!("{agency}:{id}"),
            name,
            agency: agency.to_string(),
            lat,
            lon,
        });
    }

    if skipped > 0 {
        warn!(agency, skipped, "skipped malformed stop rows");
    }
    Ok((stops, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_namespaces() {
        let csv = "stop_id,stop_name,stop_lat,stop_lon\n\
                   100,Main & First,37.5,-122.1\n";
        let (stops, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].id, "AC:100");
        assert_eq!(stops[0].name, "Main & First");
        assert_eq!(stops[0].agency, "AC");
        assert_eq!(stops[0].lat, 37.5);
    }

    #[test]
    fn skips_rows_with_bad_coordinates() {
        let csv = "stop_id,stop_name,stop_lat,stop_lon\n\
                   100,Good,37.5,-122.1\n\
                   101,Bad,not-a-number,-122.1\n";
        let (stops, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn skips_rows_missing_mandatory_columns() {
        let csv = "stop_id,stop_name\n\
                   100,No Coordinates\n";
        let (stops, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert!(stops.is_empty());
        assert_eq!(skipped, 1);
    }
}
