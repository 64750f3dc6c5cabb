//! Round-based journey search.
//!
//! This module implements the core routing algorithm: round `k` of a query
//! holds the earliest arrivals reachable with exactly `k` vehicle
//! boardings, so results are Pareto-optimal in (arrival time, transfer
//! count) by construction. The range orchestrator fans one worker out per
//! sampled departure instant over a shared immutable snapshot and merges
//! the results.

mod config;
mod range;
mod rank;
mod reconstruct;
mod worker;

pub use config::SearchConfig;
pub use range::{Orchestrator, QueryError};
pub use rank::{deduplicate, rank};
pub use reconstruct::to_wire;
pub use worker::Worker;
