//! Schedule index construction.
//!
//! Turns parsed GTFS tables into an immutable [`ScheduleIndex`]: interns
//! stop ids, applies the service-time window to trip first departures,
//! groups trips by (GTFS route, exact stop pattern), sorts each group by
//! first departure and splits out any trip that would overtake an earlier
//! one at some stop index, then derives the per-stop route adjacency and
//! attaches footpaths.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::domain::{RouteKey, ShapeKey, StopId, TripId};
use crate::footpath::{self, FootpathConfig, SpatialGrid};
use crate::gtfs::RawTables;

use super::{Route, ScheduleIndex, Stop, TimeWindow, Trip};

/// Counters from one build, logged and returned for inspection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub stops: usize,
    pub routes: usize,
    pub trips_kept: usize,
    pub trips_dropped_inconsistent: usize,
    pub trips_outside_window: usize,
    pub trips_without_usable_stops: usize,
}

struct PendingTrip {
    gtfs_id: String,
    departures: Vec<u32>,
    arrivals: Vec<u32>,
    shape: Option<ShapeKey>,
}

/// Build a snapshot from parsed tables.
pub fn build(
    tables: &RawTables,
    window: TimeWindow,
    footpath_config: &FootpathConfig,
) -> (ScheduleIndex, BuildStats) {
    let mut stats = BuildStats::default();

    // Intern stops. Duplicate ids keep their first occurrence.
    let mut stops: Vec<Stop> = Vec::with_capacity(tables.stops.len());
    let mut stop_lookup: HashMap<String, StopId> = HashMap::with_capacity(tables.stops.len());
    for rec in &tables.stops {
        if stop_lookup.contains_key(&rec.id) {
            continue;
        }
        let id = StopId(stops.len() as u32);
        stop_lookup.insert(rec.id.clone(), id);
        stops.push(Stop {
            id,
            gtfs_id: rec.id.clone(),
            name: rec.name.clone(),
            agency: rec.agency.clone(),
            lat: rec.lat,
            lon: rec.lon,
            footpaths: Vec::new(),
        });
    }
    stats.stops = stops.len();

    // Intern shapes in a deterministic order.
    let mut shapes: Vec<Vec<(f64, f64)>> = Vec::with_capacity(tables.shapes.len());
    let mut shape_lookup: HashMap<&str, ShapeKey> = HashMap::with_capacity(tables.shapes.len());
    let mut shape_ids: Vec<&String> = tables.shapes.keys().collect();
    shape_ids.sort();
    for id in shape_ids {
        shape_lookup.insert(id.as_str(), ShapeKey(shapes.len() as u32));
        shapes.push(tables.shapes[id].clone());
    }

    // Validate trips and group by (GTFS route id, exact stop pattern). The
    // BTreeMap keeps grouping order deterministic so rebuilding identical
    // input yields a structurally identical snapshot.
    let mut groups: BTreeMap<(String, Vec<StopId>), Vec<PendingTrip>> = BTreeMap::new();
    for trip in &tables.trips {
        let Some(events) = tables.stop_times.get(&trip.id) else {
            stats.trips_without_usable_stops += 1;
            continue;
        };

        let mut sequence = Vec::with_capacity(events.len());
        let mut departures = Vec::with_capacity(events.len());
        let mut arrivals = Vec::with_capacity(events.len());
        for event in events {
            // Stop events referencing stops absent from stops.txt are
            // dropped; the rest of the trip stays usable.
            if let Some(&stop) = stop_lookup.get(&event.stop_id) {
                sequence.push(stop);
                departures.push(event.departure.seconds());
                arrivals.push(event.arrival.seconds());
            }
        }
        if sequence.len() < 2 {
            stats.trips_without_usable_stops += 1;
            continue;
        }

        let monotone = (0..sequence.len()).all(|i| arrivals[i] <= departures[i])
            && (0..sequence.len() - 1).all(|i| departures[i] <= arrivals[i + 1]);
        if !monotone {
            debug!(trip = %trip.id, "dropping trip with non-monotone times");
            stats.trips_dropped_inconsistent += 1;
            continue;
        }

        if !window.contains(departures[0]) {
            stats.trips_outside_window += 1;
            continue;
        }

        groups
            .entry((trip.route_id.clone(), sequence))
            .or_default()
            .push(PendingTrip {
                gtfs_id: trip.id.clone(),
                departures,
                arrivals,
                shape: trip
                    .shape_id
                    .as_deref()
                    .and_then(|s| shape_lookup.get(s))
                    .copied(),
            });
    }

    // Emit routes and trips. Within a pattern, trips sort by departure at
    // stop 0; a trip overtaking the previously placed one at any index is
    // split into a further route with the same stop sequence, so binary
    // search over departures stays valid at every stop position.
    let mut routes: Vec<Route> = Vec::new();
    let mut trips: Vec<Trip> = Vec::new();
    let mut pattern_counters: HashMap<String, u32> = HashMap::new();
    for ((route_id, sequence), mut group) in groups {
        group.sort_by(|a, b| {
            (a.departures[0], a.arrivals[0])
                .cmp(&(b.departures[0], b.arrivals[0]))
                .then_with(|| a.gtfs_id.cmp(&b.gtfs_id))
        });

        let mut layers: Vec<Vec<PendingTrip>> = Vec::new();
        'place: for pending in group {
            for layer in layers.iter_mut() {
                let last = layer.last().unwrap();
                let fits = last
                    .departures
                    .iter()
                    .zip(&pending.departures)
                    .all(|(a, b)| a <= b)
                    && last.arrivals.iter().zip(&pending.arrivals).all(|(a, b)| a <= b);
                if fits {
                    layer.push(pending);
                    continue 'place;
                }
            }
            layers.push(vec![pending]);
        }

        let name = tables
            .route_names
            .get(&route_id)
            .cloned()
            .unwrap_or_else(|| route_id.clone());
        for layer in layers {
            let counter = pattern_counters.entry(route_id.clone()).or_insert(0);
            let display_id = format!("{route_id}:p{counter}");
            *counter += 1;

            let key = RouteKey(routes.len() as u32);
            let mut trip_ids = Vec::with_capacity(layer.len());
            for pending in layer {
                let id = TripId(trips.len() as u32);
                trip_ids.push(id);
                trips.push(Trip {
                    id,
                    gtfs_id: pending.gtfs_id,
                    route: key,
                    departures: pending.departures,
                    arrivals: pending.arrivals,
                    shape: pending.shape,
                });
            }
            routes.push(Route {
                key,
                display_id,
                name: name.clone(),
                stop_sequence: sequence.clone(),
                trips: trip_ids,
            });
        }
    }
    stats.routes = routes.len();
    stats.trips_kept = trips.len();

    // Per-stop adjacency, keeping the earliest index for routes that visit
    // a stop twice (boarding is always considered at the first occurrence).
    let mut stop_routes: Vec<Vec<(RouteKey, u32)>> = vec![Vec::new(); stops.len()];
    for route in &routes {
        for (i, &stop) in route.stop_sequence.iter().enumerate() {
            let entry = &mut stop_routes[stop.index()];
            if entry.last().is_none_or(|&(r, _)| r != route.key) {
                entry.push((route.key, i as u32));
            }
        }
    }

    footpath::attach(&mut stops, &tables.transfers, &stop_lookup, footpath_config);

    let grid = SpatialGrid::build(&stops, 0.005);

    info!(
        stops = stats.stops,
        routes = stats.routes,
        trips = stats.trips_kept,
        dropped_inconsistent = stats.trips_dropped_inconsistent,
        outside_window = stats.trips_outside_window,
        without_usable_stops = stats.trips_without_usable_stops,
        window_start = window.start,
        window_end = window.end,
        "schedule index built"
    );

    let index = ScheduleIndex {
        stops,
        routes,
        trips,
        shapes,
        stop_lookup,
        stop_routes,
        grid,
        window,
    };
    (index, stats)
}


#[cfg(test)]
mod tests {
    use super::test_support::{add_stop, add_trip};
    use super::*;

    fn base_tables() -> RawTables {
        let mut tables = RawTables::default();
        add_stop(&mut tables, "ag:A", "Alpha", 37.00, -122.00);
        add_stop(&mut tables, "ag:B", "Beta", 37.05, -122.00);
        add_stop(&mut tables, "ag:C", "Gamma", 37.10, -122.00);
        tables
    }

    fn build_all(tables: &RawTables) -> (ScheduleIndex, BuildStats) {
        build(tables, TimeWindow::unbounded(), &FootpathConfig::default())
    }

    #[test]
    fn trips_sharing_a_pattern_share_a_route() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:10:00", "08:11:00"),
            ("ag:C", "08:20:00", "08:20:00"),
        ]);
        add_trip(&mut tables, "ag:R1", "ag:T2", &[
            ("ag:A", "09:00:00", "09:00:00"),
            ("ag:B", "09:10:00", "09:11:00"),
            ("ag:C", "09:20:00", "09:20:00"),
        ]);

        let (index, stats) = build_all(&tables);
        assert_eq!(stats.routes, 1);
        assert_eq!(stats.trips_kept, 2);
        let route = &index.routes()[0];
        assert_eq!(route.display_id, "ag:R1:p0");
        assert_eq!(route.stop_sequence.len(), 3);
        // Sorted by first departure.
        let first = index.trip(route.trips[0]);
        assert_eq!(first.departures[0], 8 * 3600);
    }

    #[test]
    fn distinct_patterns_become_distinct_routes() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:10:00", "08:10:00"),
        ]);
        // Same GTFS route, different pattern (skips B).
        add_trip(&mut tables, "ag:R1", "ag:T2", &[
            ("ag:A", "08:30:00", "08:30:00"),
            ("ag:C", "08:50:00", "08:50:00"),
        ]);

        let (index, stats) = build_all(&tables);
        assert_eq!(stats.routes, 2);
        let ids: Vec<&str> = index.routes().iter().map(|r| r.display_id.as_str()).collect();
        assert_eq!(ids, vec!["ag:R1:p0", "ag:R1:p1"]);
    }

    #[test]
    fn same_pattern_different_gtfs_routes_stay_separate() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:10:00", "08:10:00"),
        ]);
        add_trip(&mut tables, "ag:R2", "ag:T2", &[
            ("ag:A", "08:05:00", "08:05:00"),
            ("ag:B", "08:15:00", "08:15:00"),
        ]);

        let (index, stats) = build_all(&tables);
        assert_eq!(stats.routes, 2);
        assert_eq!(index.num_trips(), 2);
    }

    #[test]
    fn overtaking_trip_is_partitioned_into_new_route() {
        let mut tables = base_tables();
        // T1 departs first but arrives at B later than T2: T2 overtakes.
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:30:00", "08:30:00"),
        ]);
        add_trip(&mut tables, "ag:R1", "ag:T2", &[
            ("ag:A", "08:05:00", "08:05:00"),
            ("ag:B", "08:20:00", "08:20:00"),
        ]);

        let (index, stats) = build_all(&tables);
        assert_eq!(stats.routes, 2);
        // Every route's trips are non-overtaking at every index.
        for route in index.routes() {
            for pair in route.trips.windows(2) {
                let a = index.trip(pair[0]);
                let b = index.trip(pair[1]);
                assert!(a.departures.iter().zip(&b.departures).all(|(x, y)| x <= y));
                assert!(a.arrivals.iter().zip(&b.arrivals).all(|(x, y)| x <= y));
            }
        }
    }

    #[test]
    fn window_filter_drops_trips_by_first_departure() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:10:00", "08:10:00"),
        ]);
        add_trip(&mut tables, "ag:R1", "ag:T2", &[
            ("ag:A", "13:00:00", "13:00:00"),
            ("ag:B", "13:10:00", "13:10:00"),
        ]);

        let window = TimeWindow { start: 7 * 3600, end: 12 * 3600 };
        let (index, stats) = build(&tables, window, &FootpathConfig::default());
        assert_eq!(stats.trips_kept, 1);
        assert_eq!(stats.trips_outside_window, 1);
        assert_eq!(index.window(), window);
    }

    #[test]
    fn non_monotone_trip_is_dropped() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "07:50:00", "07:50:00"),
        ]);

        let (index, stats) = build_all(&tables);
        assert!(index.is_empty());
        assert_eq!(stats.trips_dropped_inconsistent, 1);
    }

    #[test]
    fn events_at_unknown_stops_are_dropped() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:MISSING", "08:05:00", "08:05:00"),
            ("ag:B", "08:10:00", "08:10:00"),
        ]);

        let (index, stats) = build_all(&tables);
        assert_eq!(stats.trips_kept, 1);
        assert_eq!(index.routes()[0].stop_sequence.len(), 2);
    }

    #[test]
    fn trip_with_one_usable_stop_is_dropped() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:MISSING", "08:10:00", "08:10:00"),
        ]);

        let (_, stats) = build_all(&tables);
        assert_eq!(stats.trips_without_usable_stops, 1);
        assert_eq!(stats.trips_kept, 0);
    }

    #[test]
    fn earliest_index_kept_for_loop_routes() {
        let mut tables = base_tables();
        // A loop trip visiting A twice.
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:10:00", "08:10:00"),
            ("ag:A", "08:20:00", "08:20:00"),
        ]);

        let (index, _) = build_all(&tables);
        let a = index.resolve("ag:A").unwrap();
        let entries = index.routes_at(a);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, 0);
    }

    #[test]
    fn rebuild_is_structurally_identical() {
        let mut tables = base_tables();
        add_trip(&mut tables, "ag:R1", "ag:T1", &[
            ("ag:A", "08:00:00", "08:00:00"),
            ("ag:B", "08:10:00", "08:11:00"),
            ("ag:C", "08:20:00", "08:20:00"),
        ]);
        add_trip(&mut tables, "ag:R2", "ag:T2", &[
            ("ag:C", "09:00:00", "09:00:00"),
            ("ag:A", "09:30:00", "09:30:00"),
        ]);

        let (first, stats_a) = build_all(&tables);
        let (second, stats_b) = build_all(&tables);
        assert_eq!(stats_a, stats_b);
        assert_eq!(first.stops(), second.stops());
        assert_eq!(first.routes(), second.routes());
        for (a, b) in first.routes().iter().zip(second.routes()) {
            for (&ta, &tb) in a.trips.iter().zip(&b.trips) {
                assert_eq!(first.trip(ta), second.trip(tb));
            }
        }
    }

    #[test]
    fn empty_tables_build_empty_snapshot() {
        let tables = RawTables::default();
        let (index, stats) = build_all(&tables);
        assert!(index.is_empty());
        assert_eq!(stats.routes, 0);
    }
}
