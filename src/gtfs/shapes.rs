//! `shapes.txt` reader.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use super::LoadError;

/// One point of a shape polyline, before assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePoint {
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
}

#[derive(Deserialize)]
struct Record {
    shape_id: Option<String>,
    shape_pt_lat: Option<String>,
    shape_pt_lon: Option<String>,
    shape_pt_sequence: Option<String>,
}

type Shapes = HashMap<String, Vec<(f64, f64)>>;

pub fn load<R: Read>(reader: R, agency: &str) -> Result<(Shapes, u64), LoadError> {
    let mut points: HashMap<String, Vec<ShapePoint>> = HashMap::new();
    let mut skipped = 0u64;

    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = match rec {
            Ok(rec) => rec,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let parsed = (|| {
            let id = rec.shape_id.filter(|s| !s.is_empty())?;
            let lat = rec.shape_pt_lat?.trim().parse::<f64>().ok()?;
            let lon = rec.shape_pt_lon?.trim().parse::<f64>().ok()?;
            let sequence = rec.shape_pt_sequence?.trim().parse::<u32>().ok()?;
            Some((format!("{agency}:{id}"), ShapePoint { lat, lon, sequence }))
        })();

        match parsed {
            Some((id, pt)) => points.entry(id).or_default().push(pt),
            None => skipped += 1,
        }
    }

    let shapes = points
        .into_iter()
        .map(|(id, mut pts)| {
            pts.sort_by_key(|p| p.sequence);
            (id, pts.into_iter().map(|p| (p.lat, p.lon)).collect())
        })
        .collect();

    if skipped > 0 {
        warn!(agency, skipped, "skipped malformed shape rows");
    }
    Ok((shapes, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_ordered_polyline() {
        let csv = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
                   SH1,37.2,-122.0,2\n\
                   SH1,37.1,-122.0,1\n\
                   SH1,37.3,-122.0,3\n";
        let (shapes, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(
            shapes["AC:SH1"],
            vec![(37.1, -122.0), (37.2, -122.0), (37.3, -122.0)]
        );
    }

    #[test]
    fn bad_point_skipped() {
        let csv = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
                   SH1,37.1,-122.0,1\n\
                   SH1,x,-122.0,2\n";
        let (shapes, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(shapes["AC:SH1"].len(), 1);
        assert_eq!(skipped, 1);
    }
}
