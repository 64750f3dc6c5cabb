//! Domain types for the journey planner.
//!
//! Core value types shared across the crate: compact ids, service-time
//! arithmetic and validated journeys. Types enforce their invariants at
//! construction so downstream code can trust them.

mod error;
mod ids;
mod journey;
mod time;

pub use error::DomainError;
pub use ids::{RouteKey, ShapeKey, StopId, TripId};
pub use journey::{Coords, Journey, JourneyLeg, Leg};
pub use time::{wrap_aware_duration, ServiceTime, TimeError, SECONDS_PER_DAY};
