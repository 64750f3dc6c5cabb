//! Journey and leg types.
//!
//! A `Journey` is a validated sequence of legs from source to target. Legs
//! are a tagged variant: either a vehicle ride on one trip or a walk over a
//! footpath. The wire-format structs at the bottom are what the surrounding
//! HTTP layer serialises.

use serde::Serialize;

use super::error::DomainError;
use super::ids::{RouteKey, StopId, TripId};
use super::time::{wrap_aware_duration, ServiceTime};

/// One leg of a journey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leg {
    /// A ride on a single trip from one stop index to a later one.
    Ride {
        trip: TripId,
        route: RouteKey,
        board_index: usize,
        alight_index: usize,
        from: StopId,
        to: StopId,
        departure: ServiceTime,
        arrival: ServiceTime,
    },
    /// A walk over a precomputed footpath.
    Walk {
        from: StopId,
        to: StopId,
        departure: ServiceTime,
        arrival: ServiceTime,
    },
}

impl Leg {
    pub fn from_stop(&self) -> StopId {
        match self {
            Leg::Ride { from, .. } | Leg::Walk { from, .. } => *from,
        }
    }

    pub fn to_stop(&self) -> StopId {
        match self {
            Leg::Ride { to, .. } | Leg::Walk { to, .. } => *to,
        }
    }

    pub fn departure(&self) -> ServiceTime {
        match self {
            Leg::Ride { departure, .. } | Leg::Walk { departure, .. } => *departure,
        }
    }

    pub fn arrival(&self) -> ServiceTime {
        match self {
            Leg::Ride { arrival, .. } | Leg::Walk { arrival, .. } => *arrival,
        }
    }

    pub fn is_walk(&self) -> bool {
        matches!(self, Leg::Walk { .. })
    }
}

/// A complete journey from source to target.
///
/// # Invariants
///
/// - At least one leg.
/// - Consecutive legs connect (`leg[i].to == leg[i+1].from`).
/// - Times are monotone across legs (`leg[i].arrival <= leg[i+1].departure`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journey {
    legs: Vec<Leg>,
}

impl Journey {
    /// Construct a journey, validating contiguity and time order.
    pub fn new(legs: Vec<Leg>) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyJourney);
        }
        for window in legs.windows(2) {
            if window[0].to_stop() != window[1].from_stop() {
                return Err(DomainError::LegsNotContiguous(
                    window[0].to_stop().0,
                    window[1].from_stop().0,
                ));
            }
            if window[1].departure() < window[0].arrival() {
                return Err(DomainError::TimeNotMonotone(
                    window[1].departure().to_string(),
                    window[0].arrival().to_string(),
                ));
            }
        }
        Ok(Self { legs })
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Departure time of the first leg (which may be a walk).
    pub fn departure_time(&self) -> ServiceTime {
        // Safe: validated non-empty at construction.
        self.legs.first().unwrap().departure()
    }

    /// Arrival time of the last leg.
    pub fn arrival_time(&self) -> ServiceTime {
        self.legs.last().unwrap().arrival()
    }

    /// Departure time of the first vehicle boarding, if any.
    pub fn first_boarding(&self) -> Option<ServiceTime> {
        self.legs.iter().find(|l| !l.is_walk()).map(|l| l.departure())
    }

    /// Number of vehicle legs.
    pub fn ride_count(&self) -> usize {
        self.legs.iter().filter(|l| !l.is_walk()).count()
    }

    /// Number of transfers (rides minus one, zero for walk-only journeys).
    pub fn transfers(&self) -> usize {
        self.ride_count().saturating_sub(1)
    }

    /// Total duration in seconds, wrap-aware.
    pub fn duration_seconds(&self) -> u32 {
        wrap_aware_duration(self.departure_time(), self.arrival_time())
    }

    /// Signature of the vehicle legs: (trip, board index, alight index).
    ///
    /// Two journeys with equal signatures ride the exact same vehicles over
    /// the exact same spans.
    pub fn ride_signature(&self) -> Vec<(TripId, usize, usize)> {
        self.legs
            .iter()
            .filter_map(|l| match l {
                Leg::Ride {
                    trip,
                    board_index,
                    alight_index,
                    ..
                } => Some((*trip, *board_index, *alight_index)),
                Leg::Walk { .. } => None,
            })
            .collect()
    }

    /// The sequence of trips ridden, in order.
    pub fn trip_sequence(&self) -> Vec<TripId> {
        self.ride_signature().into_iter().map(|(t, _, _)| t).collect()
    }
}

/// A latitude/longitude pair in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

/// One journey leg in the wire format consumed by the HTTP layer.
///
/// Times are canonical 24-hour wall-clock strings; `route_id` is empty
/// exactly for walking legs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JourneyLeg {
    pub from_stop_id: String,
    pub from_stop: String,
    pub from_stop_coords: Coords,
    pub to_stop_id: String,
    pub to_stop: String,
    pub to_stop_coords: Coords,
    pub departure_time: String,
    pub arrival_time: String,
    pub route_id: String,
    pub route_long_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<[f64; 2]>>,
}
