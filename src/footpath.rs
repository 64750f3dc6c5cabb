//! Footpath builder.
//!
//! For every stop, precomputes the set of walkable neighbour stops with a
//! walk duration in seconds. Candidate pairs come from a coarse spatial
//! grid so the pass stays near-linear in the number of stops; `transfers.txt`
//! entries override the computed durations; the result is forced symmetric.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::StopId;
use crate::geo;
use crate::gtfs::TransferRecord;
use crate::schedule::Stop;

/// Approximate metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_000.0;

/// Parameters for footpath computation.
#[derive(Debug, Clone)]
pub struct FootpathConfig {
    /// Maximum crow-flies distance between walkable stops, in metres.
    pub radius_m: f64,

    /// Assumed walking speed in metres per second.
    pub walk_speed_mps: f64,

    /// Walk durations are clamped to at least this many seconds.
    pub min_transfer_s: u32,

    /// Walk durations are clamped to at most this many seconds.
    pub max_transfer_s: u32,
}

impl Default for FootpathConfig {
    fn default() -> Self {
        Self {
            radius_m: 500.0,
            walk_speed_mps: 1.33,
            min_transfer_s: 60,
            max_transfer_s: 1_200,
        }
    }
}

/// A grid over stop coordinates for neighbourhood queries.
///
/// Cells are square in degrees; a query inspects only the cells that can
/// contain matches.
pub struct SpatialGrid {
    cell_deg: f64,
    cells: HashMap<(i32, i32), Vec<StopId>>,
}

impl SpatialGrid {
    pub fn empty() -> Self {
        Self {
            cell_deg: 0.005,
            cells: HashMap::new(),
        }
    }

    pub fn build(stops: &[Stop], cell_deg: f64) -> Self {
        let mut cells: HashMap<(i32, i32), Vec<StopId>> = HashMap::new();
        for stop in stops {
            cells
                .entry(Self::cell_at(stop.lat, stop.lon, cell_deg))
                .or_default()
                .push(stop.id);
        }
        Self { cell_deg, cells }
    }

    fn cell_at(lat: f64, lon: f64, cell_deg: f64) -> (i32, i32) {
        ((lat / cell_deg).floor() as i32, (lon / cell_deg).floor() as i32)
    }

    /// Stops in every cell overlapping a circle of `radius_m` around the
    /// coordinate. Callers still need an exact distance check.
    pub fn candidates_within(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> impl Iterator<Item = StopId> + '_ {
        let ring = (radius_m / (self.cell_deg * METRES_PER_DEGREE)).ceil() as i32;
        let (cx, cy) = Self::cell_at(lat, lon, self.cell_deg);
        (-ring..=ring).flat_map(move |dx| {
            (-ring..=ring).flat_map(move |dy| {
                self.cells
                    .get(&(cx + dx, cy + dy))
                    .into_iter()
                    .flatten()
                    .copied()
            })
        })
    }
}

/// Populate `footpaths` on every stop.
///
/// Computed walks are `round(distance / walk_speed)` clamped to the
/// configured bounds; `transfers.txt` rows override them. If either
/// direction of a pair ends up present, both do, with the smaller duration.
pub fn attach(
    stops: &mut [Stop],
    transfers: &[TransferRecord],
    lookup: &HashMap<String, StopId>,
    config: &FootpathConfig,
) {
    let grid = SpatialGrid::build(stops, config.radius_m / METRES_PER_DEGREE);

    let mut pairs: HashMap<(StopId, StopId), u32> = HashMap::new();
    for stop in stops.iter() {
        for other in grid.candidates_within(stop.lat, stop.lon, config.radius_m) {
            if other == stop.id {
                continue;
            }
            let to = &stops[other.index()];
            let dist = geo::haversine_m(stop.lat, stop.lon, to.lat, to.lon);
            if dist <= config.radius_m {
                let walk = (dist / config.walk_speed_mps).round() as u32;
                pairs.insert(
                    (stop.id, other),
                    walk.clamp(config.min_transfer_s, config.max_transfer_s),
                );
            }
        }
    }
    let computed = pairs.len();

    let mut overrides: HashMap<(StopId, StopId), u32> = HashMap::new();
    for transfer in transfers {
        let (from, to) = match (
            lookup.get(&transfer.from_stop_id),
            lookup.get(&transfer.to_stop_id),
        ) {
            (Some(&from), Some(&to)) if from != to => (from, to),
            _ => continue,
        };
        let walk = transfer
            .duration_s
            .clamp(config.min_transfer_s, config.max_transfer_s);
        overrides
            .entry((from, to))
            .and_modify(|w| *w = (*w).min(walk))
            .or_insert(walk);
    }
    let overridden = overrides.len();

    // Symmetry: computed pairs are already mirrored (haversine is
    // symmetric), so only overrides need mirroring. A one-directional
    // transfer row wins in both directions; conflicting bidirectional rows
    // resolve to the shorter walk.
    let directed: Vec<((StopId, StopId), u32)> = overrides.iter().map(|(&k, &v)| (k, v)).collect();
    for ((from, to), walk) in directed {
        let walk = match overrides.get(&(to, from)) {
            Some(&back) => walk.min(back),
            None => walk,
        };
        overrides.insert((from, to), walk);
        overrides.insert((to, from), walk);
    }
    pairs.extend(overrides);

    for stop in stops.iter_mut() {
        stop.footpaths.clear();
    }
    let mut grouped: HashMap<StopId, Vec<(StopId, u32)>> = HashMap::new();
    for ((from, to), walk) in pairs {
        grouped.entry(from).or_default().push((to, walk));
    }
    for (from, mut neighbours) in grouped {
        neighbours.sort_by_key(|&(to, _)| to);
        stops[from.index()].footpaths = neighbours;
    }

    let total: usize = stops.iter().map(|s| s.footpaths.len()).sum();
    debug!(computed, overridden, "footpath pairs assembled");
    info!(
        stops = stops.len(),
        footpaths = total,
        "footpath computation complete"
    );
}
