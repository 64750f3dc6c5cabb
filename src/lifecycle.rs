//! Snapshot lifecycle.
//!
//! Holds the current schedule snapshot behind a single-writer lock and
//! rebuilds it on a schedule: once an hour, the loader re-reads the GTFS
//! directory filtered to `[hour - 1h, hour + 4h)` and the new snapshot is
//! swapped in atomically. In-flight queries keep the `Arc` to the snapshot
//! they started on; the old snapshot is freed when the last of them
//! finishes. A failed load never replaces the current snapshot.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use tracing::{error, info};

use crate::footpath::FootpathConfig;
use crate::gtfs::{self, LoadError};
use crate::schedule::{self, ScheduleIndex, TimeWindow};

/// Payload of the `sync_complete` observer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncComplete {
    /// Wall-clock hour (0-23) the refresh ran for.
    pub last_synced_hour: u32,
    pub window_start: u32,
    pub window_end: u32,
}

type SyncObserver = Box<dyn Fn(&SyncComplete) + Send + Sync>;

/// Owns the current snapshot and the refresh schedule.
pub struct LifecycleManager {
    data_dir: PathBuf,
    footpath_config: FootpathConfig,
    current: RwLock<Arc<ScheduleIndex>>,
    observers: Mutex<Vec<SyncObserver>>,
}

impl LifecycleManager {
    /// Create a manager with an empty initial snapshot. Queries answered
    /// before the first refresh find no journeys.
    pub fn new(data_dir: impl Into<PathBuf>, footpath_config: FootpathConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            footpath_config,
            current: RwLock::new(Arc::new(ScheduleIndex::empty())),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// The current snapshot. Cheap; clones an `Arc`.
    pub fn snapshot(&self) -> Arc<ScheduleIndex> {
        // A poisoned lock only means a reader panicked; the snapshot
        // itself is immutable and safe to hand out.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Register a callback invoked after every successful refresh.
    pub fn on_sync_complete(&self, observer: impl Fn(&SyncComplete) + Send + Sync + 'static) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(observer));
    }

    /// Rebuild the snapshot for the window around `now` and publish it.
    ///
    /// On error the current snapshot is left in place; the caller decides
    /// when to retry (the built-in timer retries next tick).
    pub fn refresh(&self, now: NaiveDateTime) -> Result<Arc<ScheduleIndex>, LoadError> {
        let (hour, window) = window_for(now);
        info!(
            hour,
            window_start = window.start,
            window_end = window.end,
            "refreshing schedule snapshot"
        );

        let tables = gtfs::load_dir(&self.data_dir)?;
        let (index, stats) = schedule::build(&tables, window, &self.footpath_config);
        let snapshot = Arc::new(index);

        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Arc::clone(&snapshot);
        }

        let event = SyncComplete {
            last_synced_hour: hour,
            window_start: window.start,
            window_end: window.end,
        };
        for observer in self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            observer(&event);
        }

        info!(
            trips = stats.trips_kept,
            routes = stats.routes,
            "snapshot published"
        );
        Ok(snapshot)
    }

    /// Refresh hourly, forever. Intended to be spawned as a task.
    pub async fn run(self: Arc<Self>) {
        loop {
            let delay = next_tick_delay(Local::now().naive_local());
            tokio::time::sleep(delay).await;

            let manager = Arc::clone(&self);
            let result =
                tokio::task::spawn_blocking(move || manager.refresh(Local::now().naive_local()))
                    .await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    error!(%error, "refresh failed, keeping current snapshot");
                }
                Err(error) => {
                    error!(%error, "refresh task failed");
                }
            }
        }
    }
}

/// The refresh window for a wall-clock instant: the enclosing hour minus
/// one hour to plus four, in service seconds, clamped at midnight on the
/// low side (late-evening windows extend past 86,400 instead).
pub fn window_for(now: NaiveDateTime) -> (u32, TimeWindow) {
    let hour = now.hour();
    let hour_start = hour * 3_600;
    let window = TimeWindow {
        start: hour_start.saturating_sub(3_600),
        end: hour_start + 4 * 3_600,
    };
    (hour, window)
}

/// Delay until the next top-of-hour tick, with a deterministic ±30 s
/// jitter derived from the subsecond clock.
fn next_tick_delay(now: NaiveDateTime) -> Duration {
    let into_hour = (now.minute() * 60 + now.second()) as i64;
    let to_boundary = 3_600 - into_hour;
    let jitter = (now.nanosecond() % 61) as i64 - 30;
    Duration::from_secs((to_boundary + jitter).max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn write_feed(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        let mut f = File::create(dir.join("stops.txt")).unwrap();
        writeln!(f, "stop_id,stop_name,stop_lat,stop_lon").unwrap();
        writeln!(f, "S1,First,37.0,-122.0").unwrap();
        writeln!(f, "S2,Second,37.1,-122.0").unwrap();

        let mut f = File::create(dir.join("routes.txt")).unwrap();
        writeln!(f, "route_id,route_short_name").unwrap();
        writeln!(f, "R1,10").unwrap();

        let mut f = File::create(dir.join("trips.txt")).unwrap();
        writeln!(f, "route_id,trip_id").unwrap();
        writeln!(f, "R1,T1").unwrap();
        writeln!(f, "R1,T2").unwrap();

        let mut f = File::create(dir.join("stop_times.txt")).unwrap();
        writeln!(f, "trip_id,arrival_time,departure_time,stop_id,stop_sequence").unwrap();
        // One trip inside a morning window, one far outside it.
        writeln!(f, "T1,08:00:00,08:00:00,S1,1").unwrap();
        writeln!(f, "T1,08:20:00,08:20:00,S2,2").unwrap();
        writeln!(f, "T2,22:00:00,22:00:00,S1,1").unwrap();
        writeln!(f, "T2,22:20:00,22:20:00,S2,2").unwrap();
    }

    #[test]
    fn window_is_hour_minus_one_to_plus_four() {
        let (hour, window) = window_for(at(10, 25));
        assert_eq!(hour, 10);
        assert_eq!(window, TimeWindow { start: 9 * 3_600, end: 14 * 3_600 });
    }

    #[test]
    fn window_saturates_at_midnight() {
        let (_, window) = window_for(at(0, 5));
        assert_eq!(window.start, 0);
        assert_eq!(window.end, 4 * 3_600);
    }

    #[test]
    fn window_extends_past_midnight_for_late_hours() {
        let (_, window) = window_for(at(23, 0));
        assert_eq!(window.start, 22 * 3_600);
        assert_eq!(window.end, 27 * 3_600);
    }

    #[test]
    fn refresh_publishes_windowed_snapshot_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());

        let manager = LifecycleManager::new(dir.path(), FootpathConfig::default());
        assert!(manager.snapshot().is_empty());

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        manager.on_sync_complete(move |event| {
            sink.lock().unwrap().push(*event);
        });

        let snapshot = manager.refresh(at(7, 30)).unwrap();
        // Only the 08:00 trip falls in [06:00, 11:00).
        assert_eq!(snapshot.num_trips(), 1);
        assert!(Arc::ptr_eq(&snapshot, &manager.snapshot()));

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![SyncComplete {
                last_synced_hour: 7,
                window_start: 6 * 3_600,
                window_end: 11 * 3_600,
            }]
        );
    }

    #[test]
    fn failed_refresh_keeps_current_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());

        let manager = LifecycleManager::new(dir.path(), FootpathConfig::default());
        let good = manager.refresh(at(7, 30)).unwrap();
        assert!(!good.is_empty());

        std::fs::remove_file(dir.path().join("stops.txt")).unwrap();

        let result = manager.refresh(at(8, 30));
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&good, &manager.snapshot()));
    }

    #[test]
    fn refresh_is_idempotent_for_identical_input() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());

        let manager = LifecycleManager::new(dir.path(), FootpathConfig::default());
        let first = manager.refresh(at(7, 30)).unwrap();
        let second = manager.refresh(at(7, 30)).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.stops(), second.stops());
        assert_eq!(first.routes(), second.routes());
        assert_eq!(first.num_trips(), second.num_trips());
    }

    #[test]
    fn observer_fires_per_successful_refresh_only() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());

        let manager = LifecycleManager::new(dir.path(), FootpathConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        manager.on_sync_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.refresh(at(7, 0)).unwrap();
        manager.refresh(at(8, 0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        std::fs::remove_file(dir.path().join("stops.txt")).unwrap();
        assert!(manager.refresh(at(9, 0)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tick_delay_is_bounded() {
        for (hour, minute) in [(0, 0), (9, 59), (12, 30), (23, 1)] {
            let delay = next_tick_delay(at(hour, minute));
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(3_630));
        }
    }
}
