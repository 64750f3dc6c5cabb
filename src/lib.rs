//! Multi-modal public-transit journey planner.
//!
//! Answers journey queries over a GTFS timetable: given a source stop, a
//! target stop and an earliest departure, returns a small set of
//! itineraries combining scheduled vehicle legs and short walking
//! transfers, Pareto-reasonable in arrival time and transfer count.
//!
//! The engine exposes two operations to its host: a range query
//! ([`raptor::Orchestrator::find_journeys`]) over the current snapshot,
//! and a refresh ([`lifecycle::LifecycleManager::refresh`]) that rebuilds
//! the snapshot from GTFS for a time window around now. The HTTP surface,
//! feed downloading and rendering live outside this crate.

pub mod domain;
pub mod footpath;
pub mod geo;
pub mod gtfs;
pub mod lifecycle;
pub mod raptor;
pub mod schedule;
