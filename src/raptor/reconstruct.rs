//! Journey reconstruction.
//!
//! Walks parent pointers backwards from the target at a given round,
//! emitting one leg per pointer: a ride pointer spans its whole
//! board-to-alight run (so consecutive stops on one trip are already a
//! single leg) and steps back one round; a walk pointer stays in its
//! round. A chain that cannot be traced to the source discards the
//! journey; the engine never surfaces a partial itinerary.

use crate::domain::{Coords, Journey, JourneyLeg, Leg, ServiceTime, StopId};
use crate::geo;
use crate::schedule::ScheduleIndex;

use super::worker::ParentLeg;

pub(crate) fn reconstruct(
    index: &ScheduleIndex,
    parents: &[Vec<ParentLeg>],
    source: StopId,
    target: StopId,
    round: usize,
) -> Option<Journey> {
    let mut legs = Vec::new();
    let mut stop = target;
    let mut round = round;
    // A valid chain has at most one ride per round plus one walk around
    // each; anything longer is a corrupt pointer loop.
    let mut remaining = 2 * parents.len() + 2;

    while stop != source {
        if remaining == 0 {
            return None;
        }
        remaining -= 1;

        match parents[round][stop.index()] {
            ParentLeg::None | ParentLeg::Source => return None,
            ParentLeg::Ride {
                trip,
                board_index,
                alight_index,
            } => {
                let trip_data = index.trip(trip);
                let route = index.route(trip_data.route);
                let board = board_index as usize;
                let alight = alight_index as usize;
                legs.push(Leg::Ride {
                    trip,
                    route: trip_data.route,
                    board_index: board,
                    alight_index: alight,
                    from: route.stop_sequence[board],
                    to: route.stop_sequence[alight],
                    departure: ServiceTime::from_seconds(trip_data.departures[board]),
                    arrival: ServiceTime::from_seconds(trip_data.arrivals[alight]),
                });
                stop = route.stop_sequence[board];
                if round == 0 {
                    return None;
                }
                round -= 1;
            }
            ParentLeg::Walk { from, depart, arrive } => {
                legs.push(Leg::Walk {
                    from,
                    to: stop,
                    departure: ServiceTime::from_seconds(depart),
                    arrival: ServiceTime::from_seconds(arrive),
                });
                stop = from;
            }
        }
    }

    legs.reverse();
    Journey::new(legs).ok()
}

/// Render a journey into the wire format.
///
/// Ride legs carry the route's display name as `RouteId` and its unique id
/// as `RouteLongId`, plus the trip shape sliced between the boarding and
/// alighting stops (falling back to a straight segment when the trip has
/// no shape). Walk legs have an empty `RouteId` and a straight segment.
pub fn to_wire(index: &ScheduleIndex, journey: &Journey) -> Vec<JourneyLeg> {
    journey
        .legs()
        .iter()
        .map(|leg| {
            let from = index.stop(leg.from_stop());
            let to = index.stop(leg.to_stop());
            let straight = vec![[from.lat, from.lon], [to.lat, to.lon]];

            let (route_id, route_long_id, shape) = match leg {
                Leg::Ride { trip, route, .. } => {
                    let route = index.route(*route);
                    let shape = match index.trip(*trip).shape {
                        Some(key) => {
                            let sliced = geo::slice_shape(
                                index.shape(key),
                                from.lat,
                                from.lon,
                                to.lat,
                                to.lon,
                            );
                            if sliced.len() >= 2 {
                                sliced
                            } else {
                                straight
                            }
                        }
                        None => straight,
                    };
                    (route.name.clone(), route.display_id.clone(), shape)
                }
                Leg::Walk { .. } => (String::new(), String::new(), straight),
            };

            JourneyLeg {
                from_stop_id: from.gtfs_id.clone(),
                from_stop: from.name.clone(),
                from_stop_coords: Coords {
                    lat: from.lat,
                    lon: from.lon,
                },
                to_stop_id: to.gtfs_id.clone(),
                to_stop: to.name.clone(),
                to_stop_coords: Coords { lat: to.lat, lon: to.lon },
                departure_time: leg.departure().wall_clock(),
                arrival_time: leg.arrival().wall_clock(),
                route_id,
                route_long_id,
                shape: Some(shape),
            }
        })
        .collect()
}
