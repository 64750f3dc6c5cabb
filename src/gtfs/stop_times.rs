//! `stop_times.txt` reader.
//!
//! Groups stop events by trip and orders them by `stop_sequence`, since
//! the file is not guaranteed to be in order. Times past 24:00:00 are kept
//! as-is by the time model.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use super::LoadError;
use crate::domain::ServiceTime;

/// One stop event on a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTimeRecord {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    pub sequence: u32,
}

#[derive(Deserialize)]
struct Record {
    trip_id: Option<String>,
    arrival_time: Option<String>,
    departure_time: Option<String>,
    stop_id: Option<String>,
    stop_sequence: Option<String>,
}

type StopTimesByTrip = HashMap<String, Vec<StopTimeRecord>>;

pub fn load<R: Read>(reader: R, agency: &str) -> Result<(StopTimesByTrip, u64), LoadError> {
    let mut by_trip: StopTimesByTrip = HashMap::new();
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
            let trip_id = rec.trip_id.filter(|s| !s.is_empty())?;
            let stop_id = rec.stop_id.filter(|s| !s.is_empty())?;
            let arrival = ServiceTime::parse(&rec.arrival_time?).ok()?;
            let departure = ServiceTime::parse(&rec.departure_time?).ok()?;
            let sequence = rec.stop_sequence?.trim().parse::<u32>().ok()?;
            Some(StopTimeRecord {
                trip_id: format!("{agency}:{trip_id}"),
                stop_id: format!("{agency}:{stop_id}"),
                arrival,
                departure,
                sequence,
            })
        })();

        match parsed {
            Some(st) => by_trip.entry(st.trip_id.clone()).or_default().push(st),
            None => skipped += 1,
        }
    }

    for events in by_trip.values_mut() {
        events.sort_by_key(|st| st.sequence);
    }

    if skipped > 0 {
        warn!(agency, skipped, "skipped malformed stop_time rows");
    }
    Ok((by_trip, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_and_orders_by_sequence() {
        let csv = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                   T1,08:10:00,08:11:00,S2,2\n\
                   T1,08:00:00,08:00:00,S1,1\n\
                   T2,09:00:00,09:00:00,S1,1\n";
        let (by_trip, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(skipped, 0);
        let t1 = &by_trip["AC:T1"];
        assert_eq!(t1.len(), 2);
        assert_eq!(t1[0].stop_id, "AC:S1");
        assert_eq!(t1[1].stop_id, "AC:S2");
        assert_eq!(t1[1].departure, ServiceTime::parse("08:11:00").unwrap());
    }

    #[test]
    fn past_midnight_times_preserved() {
        let csv = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                   T1,24:10:00,24:10:00,S1,1\n";
        let (by_trip, _) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(by_trip["AC:T1"][0].arrival.seconds(), 87_000);
    }

    #[test]
    fn bad_time_skips_row() {
        let csv = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                   T1,08:00:00,08:00:00,S1,1\n\
                   T1,eight,08:05:00,S2,2\n";
        let (by_trip, skipped) = load(csv.as_bytes(), "AC").unwrap();
        assert_eq!(by_trip["AC:T1"].len(), 1);
        assert_eq!(skipped, 1);
    }
}
