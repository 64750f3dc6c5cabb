//! One earliest-arrival RAPTOR query.
//!
//! The worker owns all per-query state: per-round arrival tables, the
//! best-arrival array, parent pointers for reconstruction, the marked-stop
//! set and the route queue. Buffers are allocated once per worker and
//! refilled between queries. The schedule index is only ever read, so any
//! number of workers can share one snapshot.
//!
//! Each round runs three phases: collect routes serving stops improved in
//! the previous round, scan those routes (alighting where the current trip
//! improves a stop, hopping onto earlier catchable trips via binary
//! search), then relax footpaths from stops the scan improved. Footpaths
//! never chain within a round.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::domain::{Journey, RouteKey, ServiceTime, StopId, TripId};
use crate::geo;
use crate::schedule::{ScheduleIndex, INFINITY};

use super::config::SearchConfig;
use super::reconstruct::reconstruct;

/// Back-pointer recording how a stop's round arrival was achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParentLeg {
    /// No arrival recorded.
    None,
    /// The query origin at its departure instant.
    Source,
    /// Rode a trip from its `board_index` to `alight_index`.
    Ride {
        trip: TripId,
        board_index: u32,
        alight_index: u32,
    },
    /// Walked a footpath from `from`.
    Walk { from: StopId, depart: u32, arrive: u32 },
}

/// Stop set with O(1) membership and insertion order, cleared per round.
struct MarkSet {
    member: Vec<bool>,
    items: Vec<StopId>,
}

impl MarkSet {
    fn new(n: usize) -> Self {
        Self {
            member: vec![false; n],
            items: Vec::new(),
        }
    }

    fn insert(&mut self, stop: StopId) {
        if !self.member[stop.index()] {
            self.member[stop.index()] = true;
            self.items.push(stop);
        }
    }

    fn clear(&mut self) {
        for stop in self.items.drain(..) {
            self.member[stop.index()] = false;
        }
    }

    fn items(&self) -> &[StopId] {
        &self.items
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Route → earliest scan-start index, rebuilt each round.
struct RouteQueue {
    start: Vec<u32>,
    touched: Vec<RouteKey>,
}

impl RouteQueue {
    fn new(n: usize) -> Self {
        Self {
            start: vec![INFINITY; n],
            touched: Vec::new(),
        }
    }

    fn insert_min(&mut self, route: RouteKey, index: u32) {
        let slot = &mut self.start[route.index()];
        if *slot == INFINITY {
            self.touched.push(route);
        }
        if index < *slot {
            *slot = index;
        }
    }

    fn drain(&mut self) -> Vec<(RouteKey, u32)> {
        let mut drained = Vec::with_capacity(self.touched.len());
        for &route in &self.touched {
            drained.push((route, self.start[route.index()]));
        }
        for &(route, _) in &drained {
            self.start[route.index()] = INFINITY;
        }
        self.touched.clear();
        drained
    }
}

/// A reusable earliest-arrival search over one schedule snapshot.
pub struct Worker<'a> {
    index: &'a ScheduleIndex,
    config: &'a SearchConfig,
    /// `rounds[k][stop]`: earliest arrival using exactly k boardings.
    rounds: Vec<Vec<u32>>,
    /// Earliest arrival over all rounds so far.
    best: Vec<u32>,
    parents: Vec<Vec<ParentLeg>>,
    marked: MarkSet,
    queue: RouteQueue,
    /// Lower bound in seconds from each stop to the query target.
    bounds: Vec<u32>,
}

impl<'a> Worker<'a> {
    pub fn new(index: &'a ScheduleIndex, config: &'a SearchConfig) -> Self {
        let n = index.num_stops();
        let k = config.max_rounds + 1;
        Self {
            index,
            config,
            rounds: vec![vec![INFINITY; n]; k],
            best: vec![INFINITY; n],
            parents: vec![vec![ParentLeg::None; n]; k],
            marked: MarkSet::new(n),
            queue: RouteQueue::new(index.num_routes()),
            bounds: vec![0; n],
        }
    }

    fn reset(&mut self, target: StopId) {
        for round in &mut self.rounds {
            round.fill(INFINITY);
        }
        for round in &mut self.parents {
            round.fill(ParentLeg::None);
        }
        self.best.fill(INFINITY);
        self.marked.clear();

        if self.config.heuristic_pruning {
            let t = self.index.stop(target);
            let speed = self.config.max_vehicle_speed_mps;
            for (bound, stop) in self.bounds.iter_mut().zip(self.index.stops()) {
                *bound = geo::lower_bound_seconds(stop.lat, stop.lon, t.lat, t.lon, speed);
            }
        }
    }

    /// A candidate arrival at `stop` survives pruning if it could still
    /// beat the best known arrival at the target.
    fn passes_bound(&self, candidate: u32, stop: StopId, best_target: u32) -> bool {
        if !self.config.heuristic_pruning || best_target == INFINITY {
            return true;
        }
        candidate.saturating_add(self.bounds[stop.index()]) < best_target
    }

    /// Run one earliest-arrival query.
    ///
    /// Returns the Pareto set over boarding counts: one journey for each
    /// round that strictly improves the target's arrival. Cancellation is
    /// observed between rounds and yields no journeys.
    pub fn query(
        &mut self,
        source: StopId,
        target: StopId,
        t0: ServiceTime,
        cancel: &AtomicBool,
    ) -> Vec<Journey> {
        let index = self.index;
        let t0 = t0.seconds();
        self.reset(target);

        // Round 0: the origin, plus footpaths out of it. The initial walk
        // is not a boarding.
        self.rounds[0][source.index()] = t0;
        self.best[source.index()] = t0;
        self.parents[0][source.index()] = ParentLeg::Source;
        self.marked.insert(source);
        for &(neighbour, walk) in &index.stop(source).footpaths {
            let candidate = t0 + walk;
            if candidate < self.best[neighbour.index()] {
                self.rounds[0][neighbour.index()] = candidate;
                self.best[neighbour.index()] = candidate;
                self.parents[0][neighbour.index()] = ParentLeg::Walk {
                    from: source,
                    depart: t0,
                    arrive: candidate,
                };
                self.marked.insert(neighbour);
            }
        }

        for k in 1..=self.config.max_rounds {
            if cancel.load(Ordering::Relaxed) {
                debug!(round = k, "query cancelled");
                return Vec::new();
            }

            // Phase A: queue each route serving a marked stop at the
            // smallest index any contributor reaches it.
            for &stop in self.marked.items() {
                let reached = self.rounds[k - 1][stop.index()];
                for &(route_key, stop_index) in index.routes_at(stop) {
                    let route = index.route(route_key);
                    if stop_index as usize + 1 >= route.stop_sequence.len() {
                        continue;
                    }
                    // Nothing to catch if even the last trip has left.
                    let last = index.trip(*route.trips.last().unwrap());
                    if last.departures[stop_index as usize] < reached + self.config.board_buffer_s
                    {
                        continue;
                    }
                    self.queue.insert_min(route_key, stop_index);
                }
            }
            self.marked.clear();

            // Phase B: scan queued routes.
            for (route_key, start_index) in self.queue.drain() {
                let route = index.route(route_key);
                let sequence = &route.stop_sequence;
                // (position in route.trips, board index on the sequence)
                let mut current: Option<(usize, usize)> = None;

                for i in start_index as usize..sequence.len() {
                    let stop = sequence[i];
                    let best_target = self.best[target.index()];

                    // Alight: does the trip we are on improve this stop?
                    if let Some((trip_pos, board_index)) = current {
                        let trip = index.trip(route.trips[trip_pos]);
                        let arrival = trip.arrivals[i];
                        if arrival < self.best[stop.index()].min(best_target)
                            && self.passes_bound(arrival, stop, best_target)
                        {
                            self.rounds[k][stop.index()] = arrival;
                            self.best[stop.index()] = arrival;
                            self.parents[k][stop.index()] = ParentLeg::Ride {
                                trip: trip.id,
                                board_index: board_index as u32,
                                alight_index: i as u32,
                            };
                            self.marked.insert(stop);
                        }
                    }

                    // Board: can the previous round's arrival here catch an
                    // earlier trip?
                    let reached = self.rounds[k - 1][stop.index()];
                    if reached == INFINITY {
                        continue;
                    }
                    if !self.passes_bound(reached, stop, self.best[target.index()]) {
                        continue;
                    }
                    let earliest = reached + self.config.board_buffer_s;
                    let pos = route
                        .trips
                        .partition_point(|&t| index.trip(t).departures[i] < earliest);
                    if pos < route.trips.len() {
                        let departure = index.trip(route.trips[pos]).departures[i];
                        let switch = match current {
                            None => true,
                            Some((cur, _)) => departure < index.trip(route.trips[cur]).departures[i],
                        };
                        if switch {
                            current = Some((pos, i));
                        }
                    }
                }
            }

            // Phase C: relax footpaths from stops the scan improved.
            // Walk-reached stops are marked for the next round but not
            // walked onward, so footpaths never chain.
            let ride_marked: Vec<StopId> = self.marked.items().to_vec();
            for stop in ride_marked {
                let arrival = self.rounds[k][stop.index()];
                for &(neighbour, walk) in &index.stop(stop).footpaths {
                    let candidate = arrival + walk;
                    let best_target = self.best[target.index()];
                    if candidate < self.best[neighbour.index()].min(best_target)
                        && self.passes_bound(candidate, neighbour, best_target)
                    {
                        self.rounds[k][neighbour.index()] = candidate;
                        self.best[neighbour.index()] = candidate;
                        self.parents[k][neighbour.index()] = ParentLeg::Walk {
                            from: stop,
                            depart: arrival,
                            arrive: candidate,
                        };
                        self.marked.insert(neighbour);
                    }
                }
            }

            if self.marked.is_empty() {
                trace!(round = k, "no stops improved, search settled");
                break;
            }
        }

        self.collect(source, target)
    }

    /// Reconstruct one journey per round that strictly improved the target.
    fn collect(&self, source: StopId, target: StopId) -> Vec<Journey> {
        let mut journeys = Vec::new();
        let mut best = INFINITY;
        for k in 0..=self.config.max_rounds {
            let arrival = self.rounds[k][target.index()];
            if arrival >= best {
                continue;
            }
            best = arrival;
            match reconstruct(self.index, &self.parents, source, target, k) {
                Some(journey) => journeys.push(journey),
                None => {
                    // A broken parent chain means this round's label cannot
                    // be turned into a consistent journey; drop it rather
                    // than surface a partial one.
                    debug!(round = k, "discarding unreconstructable journey");
                }
            }
        }
        journeys
    }
}
