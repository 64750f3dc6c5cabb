//! Deduplication and ranking of range-query results.

use std::collections::HashMap;

use crate::domain::{Journey, ServiceTime, TripId};

/// Remove duplicate journeys collected from different departure samples.
///
/// Two journeys are duplicates when they ride the same vehicles over the
/// same spans, or when they share first departure, final arrival and trip
/// sequence. Of a duplicate group, the journey with the earliest first
/// departure survives; ties resolve to the shortest duration.
pub fn deduplicate(journeys: Vec<Journey>) -> Vec<Journey> {
    let by_signature = keep_best(journeys, |j| SignatureKey::Rides(j.ride_signature()));
    keep_best(by_signature, |j| {
        SignatureKey::Times(
            j.departure_time(),
            j.arrival_time(),
            j.trip_sequence(),
        )
    })
}

#[derive(PartialEq, Eq, Hash)]
enum SignatureKey {
    Rides(Vec<(TripId, usize, usize)>),
    Times(ServiceTime, ServiceTime, Vec<TripId>),
}

fn keep_best<F>(journeys: Vec<Journey>, key: F) -> Vec<Journey>
where
    F: Fn(&Journey) -> SignatureKey,
{
    let mut best: HashMap<SignatureKey, Journey> = HashMap::new();
    for journey in journeys {
        let k = key(&journey);
        match best.get(&k) {
            Some(existing) if !beats(&journey, existing) => {}
            _ => {
                best.insert(k, journey);
            }
        }
    }
    best.into_values().collect()
}

fn beats(candidate: &Journey, existing: &Journey) -> bool {
    (candidate.departure_time(), candidate.duration_seconds())
        < (existing.departure_time(), existing.duration_seconds())
}

/// Order journeys by first departure, then total duration (wrap-aware).
///
/// Remaining ties fall back to transfer count and trip sequence so the
/// ranking is deterministic regardless of worker completion order.
pub fn rank(mut journeys: Vec<Journey>) -> Vec<Journey> {
    journeys.sort_by_cached_key(|j| {
        (
            j.departure_time(),
            j.duration_seconds(),
            j.transfers(),
            j.trip_sequence(),
        )
    });
    journeys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Leg, RouteKey, StopId};

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse(s).unwrap()
    }

    fn ride_journey(trip: u32, dep: &str, arr: &str) -> Journey {
        Journey::new(vec![Leg::Ride {
            trip: TripId(trip),
            route: RouteKey(0),
            board_index: 0,
            alight_index: 1,
            from: StopId(0),
            to: StopId(1),
            departure: t(dep),
            arrival: t(arr),
        }])
        .unwrap()
    }

    fn walk_then_ride(walk_dep: &str, ride_dep: &str, arr: &str, trip: u32) -> Journey {
        Journey::new(vec![
            Leg::Walk {
                from: StopId(2),
                to: StopId(0),
                departure: t(walk_dep),
                arrival: t(ride_dep),
            },
            Leg::Ride {
                trip: TripId(trip),
                route: RouteKey(0),
                board_index: 0,
                alight_index: 1,
                from: StopId(0),
                to: StopId(1),
                departure: t(ride_dep),
                arrival: t(arr),
            },
        ])
        .unwrap()
    }

    #[test]
    fn identical_rides_collapse() {
        let journeys = vec![
            ride_journey(1, "08:00:00", "08:20:00"),
            ride_journey(1, "08:00:00", "08:20:00"),
            ride_journey(2, "08:15:00", "08:35:00"),
        ];
        let deduped = deduplicate(journeys);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn same_rides_different_walk_start_keep_earliest() {
        let journeys = vec![
            walk_then_ride("07:58:00", "08:00:00", "08:20:00", 1),
            walk_then_ride("07:50:00", "08:00:00", "08:20:00", 1),
        ];
        let deduped = deduplicate(journeys);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].departure_time(), t("07:50:00"));
    }

    #[test]
    fn rank_orders_by_departure_then_duration() {
        let journeys = vec![
            ride_journey(3, "08:30:00", "08:50:00"),
            ride_journey(1, "08:00:00", "08:25:00"),
            ride_journey(2, "08:00:00", "08:20:00"),
        ];
        let ranked = rank(journeys);
        assert_eq!(ranked[0].departure_time(), t("08:00:00"));
        assert_eq!(ranked[0].arrival_time(), t("08:20:00"));
        assert_eq!(ranked[1].arrival_time(), t("08:25:00"));
        assert_eq!(ranked[2].departure_time(), t("08:30:00"));
    }

    #[test]
    fn empty_input() {
        assert!(deduplicate(vec![]).is_empty());
        assert!(rank(vec![]).is_empty());
    }
}
