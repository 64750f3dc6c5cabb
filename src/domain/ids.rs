//! Compact identifier types.
//!
//! GTFS identifiers are strings ("agency:stop_id"). The loader interns them
//! into dense `u32` indices so query state can live in flat arrays instead
//! of hash maps. The original string ids survive on the indexed records for
//! display and for resolving caller-supplied ids.

use std::fmt;

/// Index of a stop in the schedule index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopId(pub u32);

/// Index of a route (RAPTOR sense: one stop pattern) in the schedule index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey(pub u32);

/// Index of a trip in the schedule index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripId(pub u32);

/// Index of a shape polyline in the schedule index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey(pub u32);

impl StopId {
    /// Returns the id as a usize for array indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl RouteKey {
    /// Returns the key as a usize for array indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TripId {
    /// Returns the id as a usize for array indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ShapeKey {
    /// Returns the key as a usize for array indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Debug for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteKey({})", self.0)
    }
}

impl fmt::Debug for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripId({})", self.0)
    }
}

impl fmt::Debug for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeKey({})", self.0)
    }
}
