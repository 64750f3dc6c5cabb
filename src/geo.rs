//! Geographic helpers.
//!
//! Great-circle distance between stops, the admissible travel-time lower
//! bound used for search pruning, and slicing of trip shape polylines to
//! the span between a boarding and an alighting stop.

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in metres between two coordinates.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Lower bound in seconds on travel time between two coordinates.
///
/// Divides the great-circle distance by `max_speed_mps`, which must be at
/// least as fast as any vehicle in the network for the bound to be
/// admissible. Walking is slower than any vehicle, so the bound also holds
/// for journeys that end in a footpath.
pub fn lower_bound_seconds(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    max_speed_mps: f64,
) -> u32 {
    (haversine_m(lat1, lon1, lat2, lon2) / max_speed_mps).floor() as u32
}

/// Slice a shape polyline to the span between two stops.
///
/// Finds the shape point nearest the boarding stop, then the point nearest
/// the alighting stop at or after it (shapes are directional), and returns
/// that inclusive span. Returns an empty slice for an empty shape.
pub fn slice_shape(
    shape: &[(f64, f64)],
    from_lat: f64,
    from_lon: f64,
    to_lat: f64,
    to_lon: f64,
) -> Vec<[f64; 2]> {
    if shape.is_empty() {
        return Vec::new();
    }

    let dist_sq =
        |p: &(f64, f64), lat: f64, lon: f64| (p.0 - lat).powi(2) + (p.1 - lon).powi(2);

    let mut start = 0;
    let mut best = f64::INFINITY;
    for (i, pt) in shape.iter().enumerate() {
        let d = dist_sq(pt, from_lat, from_lon);
        if d < best {
            best = d;
            start = i;
        }
    }

    let mut end = start;
    let mut best = f64::INFINITY;
    for (i, pt) in shape.iter().enumerate().skip(start) {
        let d = dist_sq(pt, to_lat, to_lon);
        if d <= best {
            best = d;
            end = i;
        }
    }

    shape[start..=end].iter().map(|&(lat, lon)| [lat, lon]).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Distance is symmetric.
        #[test]
        fn symmetric(
            lat1 in -60.0f64..60.0, lon1 in -179.0f64..179.0,
            lat2 in -60.0f64..60.0, lon2 in -179.0f64..179.0,
        ) {
            let ab = haversine_m(lat1, lon1, lat2, lon2);
            let ba = haversine_m(lat2, lon2, lat1, lon1);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        /// Distance is non-negative and zero to self.
        #[test]
        fn non_negative(lat in -60.0f64..60.0, lon in -179.0f64..179.0) {
            prop_assert!(haversine_m(lat, lon, lat, lon).abs() < 1e-9);
            prop_assert!(haversine_m(lat, lon, lat + 0.1, lon) > 0.0);
        }

        /// A faster speed never raises the lower bound.
        #[test]
        fn bound_monotone_in_speed(
            lat1 in -60.0f64..60.0, lon1 in -179.0f64..179.0,
            lat2 in -60.0f64..60.0, lon2 in -179.0f64..179.0,
            speed in 1.0f64..30.0,
        ) {
            let slower = lower_bound_seconds(lat1, lon1, lat2, lon2, speed);
            let faster = lower_bound_seconds(lat1, lon1, lat2, lon2, speed * 2.0);
            prop_assert!(faster <= slower);
        }

        /// Slices are always a contiguous, in-order subsequence.
        #[test]
        fn slice_is_ordered_subsequence(
            len in 2usize..20,
            from in 0usize..20,
            to in 0usize..20,
        ) {
            let shape: Vec<(f64, f64)> = (0..len).map(|i| (0.0, i as f64)).collect();
            let from_lon = (from % len) as f64;
            let to_lon = (to % len) as f64;
            let sliced = slice_shape(&shape, 0.0, from_lon, 0.0, to_lon);
            prop_assert!(!sliced.is_empty());
            for w in sliced.windows(2) {
                prop_assert!(w[1][1] > w[0][1]);
            }
        }
    }
}
