//! Search configuration.

use std::time::Duration;

/// Parameters for journey search and the range query wrapper.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of vehicle boardings per journey.
    pub max_rounds: usize,

    /// Minimum seconds between arriving somewhere and boarding a vehicle.
    pub board_buffer_s: u32,

    /// Width of the range-query departure window in seconds.
    pub window_s: u32,

    /// Maximum number of departure instants sampled per range query.
    pub max_samples: usize,

    /// Maximum number of journeys returned by a range query.
    pub max_results: usize,

    /// Overall deadline for one range query; on expiry, completed journeys
    /// are returned and the rest cancelled.
    pub deadline: Duration,

    /// Whether to prune the search with the geometric lower bound to the
    /// target. Disabling only affects running time, never results.
    pub heuristic_pruning: bool,

    /// Speed used for the admissible lower bound, in metres per second.
    /// Must be at least as fast as any vehicle in the network.
    pub max_vehicle_speed_mps: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            board_buffer_s: 60,
            window_s: 3_600,
            max_samples: 100,
            max_results: 10,
            deadline: Duration::from_secs(10),
            heuristic_pruning: true,
            max_vehicle_speed_mps: 40.0,
        }
    }
}
