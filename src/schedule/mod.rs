//! The in-memory schedule index.
//!
//! A `ScheduleIndex` is an immutable snapshot of the timetable: interned
//! stops, routes in the RAPTOR sense (one route per distinct stop pattern),
//! trips with flat arrival/departure arrays, shape polylines, and the
//! derived adjacency used by the search. Snapshots are built by
//! [`build`](self::build), published behind an `Arc` by the lifecycle
//! manager, and never mutated afterwards; workers read them concurrently
//! without locks.

mod build;

use std::collections::HashMap;

use crate::domain::{RouteKey, ShapeKey, StopId, TripId};
use crate::footpath::SpatialGrid;
use crate::geo;

pub use build::{build, BuildStats};

#[cfg(test)]
pub(crate) use build::test_support;

/// Arrival/departure sentinel for "not reachable".
pub const INFINITY: u32 = u32::MAX;

/// A transit stop with its precomputed walking neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub gtfs_id: String,
    pub name: String,
    pub agency: String,
    pub lat: f64,
    pub lon: f64,
    /// Walkable neighbours as (stop, walk seconds); symmetric, no self
    /// entries, each neighbour at most once.
    pub footpaths: Vec<(StopId, u32)>,
}

/// A route in the RAPTOR sense: an ordered stop pattern shared by trips.
///
/// Trips are sorted by departure at stop index 0 and never overtake each
/// other at any index, so the earliest catchable trip at any stop position
/// can be found by binary search.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub key: RouteKey,
    /// Unique display id: the GTFS route id plus a pattern discriminator.
    pub display_id: String,
    /// Human-facing name from routes.txt.
    pub name: String,
    pub stop_sequence: Vec<StopId>,
    pub trips: Vec<TripId>,
}

/// A scheduled vehicle run along one route.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub gtfs_id: String,
    pub route: RouteKey,
    /// Seconds since service midnight, one entry per stop in the route's
    /// sequence. `arrivals[i] <= departures[i] <= arrivals[i + 1]`.
    pub departures: Vec<u32>,
    pub arrivals: Vec<u32>,
    pub shape: Option<ShapeKey>,
}

/// Half-open service-time window `[start, end)` applied to trip first
/// departures at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    /// A window admitting every trip.
    pub fn unbounded() -> Self {
        Self { start: 0, end: u32::MAX }
    }

    pub fn contains(&self, t: u32) -> bool {
        t >= self.start && t < self.end
    }
}

/// An immutable timetable snapshot.
pub struct ScheduleIndex {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    trips: Vec<Trip>,
    shapes: Vec<Vec<(f64, f64)>>,
    stop_lookup: HashMap<String, StopId>,
    /// Per stop: routes serving it with the earliest index of the stop in
    /// each route's sequence.
    stop_routes: Vec<Vec<(RouteKey, u32)>>,
    grid: SpatialGrid,
    window: TimeWindow,
}

impl ScheduleIndex {
    /// An empty snapshot; every query against it returns no journeys.
    pub fn empty() -> Self {
        Self {
            stops: Vec::new(),
            routes: Vec::new(),
            trips: Vec::new(),
            shapes: Vec::new(),
            stop_lookup: HashMap::new(),
            stop_routes: Vec::new(),
            grid: SpatialGrid::empty(),
            window: TimeWindow { start: 0, end: 0 },
        }
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn num_trips(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn stop(&self, id: StopId) -> &Stop {
        &self.stops[id.index()]
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn route(&self, key: RouteKey) -> &Route {
        &self.routes[key.index()]
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn trip(&self, id: TripId) -> &Trip {
        &self.trips[id.index()]
    }

    pub fn shape(&self, key: ShapeKey) -> &[(f64, f64)] {
        &self.shapes[key.index()]
    }

    /// Resolve a GTFS stop id string to its interned id.
    pub fn resolve(&self, gtfs_id: &str) -> Option<StopId> {
        self.stop_lookup.get(gtfs_id).copied()
    }

    /// Routes serving `stop`, each with the stop's earliest index in the
    /// route's sequence.
    pub fn routes_at(&self, stop: StopId) -> &[(RouteKey, u32)] {
        &self.stop_routes[stop.index()]
    }

    /// The window this snapshot was filtered to.
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Stops within `radius_m` of a coordinate, nearest first.
    pub fn nearest_stops(&self, lat: f64, lon: f64, radius_m: f64, limit: usize) -> Vec<StopId> {
        let mut candidates: Vec<(StopId, f64)> = self
            .grid
            .candidates_within(lat, lon, radius_m)
            .filter_map(|id| {
                let stop = self.stop(id);
                let d = geo::haversine_m(lat, lon, stop.lat, stop.lon);
                (d <= radius_m).then_some((id, d))
            })
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(limit);
        candidates.into_iter().map(|(id, _)| id).collect()
    }
}
