//! `transfers.txt` reader.
//!
//! Only `transfer_type` 2 rows ("requires a minimum transfer time") carry a
//! usable duration; other types are ignored, matching how the footpath
//! builder consumes this table.

use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use super::LoadError;

/// A timed transfer between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub duration_s: u32,
}

#[derive(Deserialize)]
struct Record {
    from_stop_id: Option<String>,
    to_stop_id: Option<String>,
    transfer_type: Option<String>,
    min_transfer_time: Option<String>,
}

pub fn load<R: Read>(reader: R, agency: &str) -> Result<(Vec<TransferRecord>, u64), LoadError> {
    let mut transfers = Vec::new();
    let mut skipped = 0u64;

    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = match rec {
            Ok(rec) => rec,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let transfer_type = rec
            .transfer_type
            .as_deref()
            .map(str::trim)
            .and_then(|t| t.parse::<u32>().ok());
        if transfer_type != Some(2) {
            continue;
        }
        let parsed = (|| {
            let from = rec.from_stop_id.filter(|s| !s.is_empty())?;
            let to = rec.to_stop_id.filter(|s| !s.is_empty())?;
            let duration_s = rec.min_transfer_time?.trim().parse::<u32>().ok()?;
            Some(TransferRecord {
                from_stop_id: format!("{agency}:{from}"),
                to_stop_id: format!("{agency}:{to}"),
                duration_s,
            })
        })();

        match parsed {
            Some(t) => transfers.push(t),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(agency, skipped, "skipped malformed transfer rows");
    }
    Ok((transfers, skipped))
}
