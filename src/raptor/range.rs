//! Range query orchestration.
//!
//! A range query samples departure instants within a window, runs one
//! independent RAPTOR worker per sample against the shared read-only
//! snapshot, then merges: strict-window filter, deduplication, ranking,
//! truncation. The whole query is bounded by a deadline; on expiry the
//! workers' cancellation flag is raised and whatever finished is returned.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::domain::{Journey, JourneyLeg, ServiceTime, StopId, TimeError};
use crate::schedule::ScheduleIndex;

use super::config::SearchConfig;
use super::rank::{deduplicate, rank};
use super::reconstruct::to_wire;
use super::worker::Worker;

/// Error from a journey query.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// Unknown source or target stop id
    #[error("unknown stop id: {0}")]
    InvalidStop(String),

    /// Unparsable departure time
    #[error("invalid departure time: {0}")]
    InvalidTime(#[from] TimeError),
}

/// Runs range queries against one schedule snapshot.
pub struct Orchestrator {
    index: Arc<ScheduleIndex>,
    config: SearchConfig,
}

impl Orchestrator {
    pub fn new(index: Arc<ScheduleIndex>, config: SearchConfig) -> Self {
        Self { index, config }
    }

    /// Find journeys departing within the configured window.
    ///
    /// `earliest_dep_hms` is `HH:MM:SS` in the service's local timezone.
    /// An unreachable target yields an empty list, not an error.
    #[instrument(skip(self))]
    pub async fn find_journeys(
        &self,
        source: &str,
        target: &str,
        earliest_dep_hms: &str,
    ) -> Result<Vec<Vec<JourneyLeg>>, QueryError> {
        let source_id = self
            .index
            .resolve(source)
            .ok_or_else(|| QueryError::InvalidStop(source.to_string()))?;
        let target_id = self
            .index
            .resolve(target)
            .ok_or_else(|| QueryError::InvalidStop(target.to_string()))?;
        let earliest = ServiceTime::parse(earliest_dep_hms)?;

        let journeys = self.run_range(source_id, target_id, earliest).await;
        Ok(journeys
            .iter()
            .map(|j| to_wire(&self.index, j))
            .collect())
    }

    /// The typed-result core of [`find_journeys`].
    pub async fn run_range(
        &self,
        source: StopId,
        target: StopId,
        earliest: ServiceTime,
    ) -> Vec<Journey> {
        let earliest = earliest.seconds();
        let samples = sample_departures(
            &self.index,
            source,
            earliest,
            self.config.window_s,
            self.config.max_samples,
        );
        debug!(samples = samples.len(), "dispatching range query workers");

        let cancel = Arc::new(AtomicBool::new(false));
        let deadline = tokio::time::Instant::now() + self.config.deadline;
        let mut tasks = JoinSet::new();
        for t0 in samples {
            let index = Arc::clone(&self.index);
            let config = self.config.clone();
            let cancel = Arc::clone(&cancel);
            tasks.spawn_blocking(move || {
                let mut worker = Worker::new(&index, &config);
                worker.query(source, target, ServiceTime::from_seconds(t0), &cancel)
            });
        }

        let mut collected: Vec<Journey> = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(journeys))) => collected.extend(journeys),
                Ok(Some(Err(join_error))) => {
                    warn!(error = %join_error, "range query worker failed");
                }
                Ok(None) => break,
                Err(_) => {
                    cancel.store(true, Ordering::Relaxed);
                    warn!("range query deadline reached, returning completed journeys");
                    break;
                }
            }
        }

        // Strict window: a journey whose first boarding departs at or past
        // the window's end is out, regardless of which sample found it.
        // Walk-only journeys have no boarding and always qualify.
        let window_end = earliest + self.config.window_s;
        let in_window: Vec<Journey> = collected
            .into_iter()
            .filter(|j| match j.first_boarding() {
                Some(boarding) => boarding.seconds() < window_end,
                None => true,
            })
            .collect();

        let mut journeys = rank(deduplicate(in_window));
        journeys.truncate(self.config.max_results);
        journeys
    }
}

/// Candidate departure instants for a range query.
///
/// Every trip departure at the source within `[earliest, earliest + window)`
/// is a candidate, as is every departure at a stop one footpath away that
/// is still reachable after walking there; the earliest instant itself is
/// always included. At most `max` candidates survive, ascending.
fn sample_departures(
    index: &ScheduleIndex,
    source: StopId,
    earliest: u32,
    window: u32,
    max: usize,
) -> Vec<u32> {
    let end = earliest + window;
    let mut times = BTreeSet::new();
    times.insert(earliest);

    let mut collect_at = |stop: StopId, not_before: u32| {
        for &(route_key, stop_index) in index.routes_at(stop) {
            let route = index.route(route_key);
            if stop_index as usize + 1 >= route.stop_sequence.len() {
                continue;
            }
            for &trip in &route.trips {
                let departure = index.trip(trip).departures[stop_index as usize];
                if departure >= not_before && departure < end {
                    times.insert(departure);
                }
            }
        }
    };

    collect_at(source, earliest);
    for &(neighbour, walk) in &index.stop(source).footpaths {
        collect_at(neighbour, earliest + walk);
    }

    times.into_iter().take(max).collect()
}
