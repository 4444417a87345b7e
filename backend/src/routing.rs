use shared::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points given in degrees.
///
/// Returns `f64::INFINITY` when any input is not a finite number. Callers must
/// treat that value as "unknown", never as a real distance.
pub fn haversine_m(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    if ![lat_a, lon_a, lat_b, lon_b].iter().all(|v| v.is_finite()) {
        tracing::error!(
            "cannot compute haversine distance for ({lat_a},{lon_a}) to ({lat_b},{lon_b})"
        );
        return f64::INFINITY;
    }

    let lat1 = lat_a.to_radians();
    let lat2 = lat_b.to_radians();
    let dlat = (lat_b - lat_a).to_radians();
    let dlon = (lon_b - lon_a).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn distance_between(a: Coordinate, b: Coordinate) -> f64 {
    haversine_m(a.lat, a.lon, b.lat, b.lon)
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    distance_between(a, b) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_m(45.0, 5.0, 45.0, 5.0), 0.0);
    }

    #[test]
    fn test_haversine_symmetry() {
        let a = Coordinate::new(5.0, 45.0);
        let b = Coordinate::new(6.0, 46.0);
        assert!((distance_between(a, b) - distance_between(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_1km_north() {
        let dist = haversine_m(45.0, 5.0, 45.009, 5.0);
        assert!((dist - 1000.0).abs() < 10.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris to London, roughly 343 km
        let dist = haversine_m(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((dist - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn test_haversine_non_numeric_is_infinite() {
        assert_eq!(haversine_m(f64::NAN, 5.0, 45.0, 5.0), f64::INFINITY);
        assert_eq!(haversine_m(45.0, 5.0, 45.0, f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_haversine_km_matches_meters() {
        let a = Coordinate::new(2.3522, 48.8566);
        let b = Coordinate::new(-0.1278, 51.5074);
        assert!((haversine_km(a, b) * 1000.0 - distance_between(a, b)).abs() < 1e-6);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn non_finite() -> impl Strategy<Value = f64> {
            prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)]
        }

        proptest! {
            #[test]
            fn any_non_finite_input_is_unknown(
                inputs in (-90.0..=90.0f64, -180.0..=180.0f64, -90.0..=90.0f64, -180.0..=180.0f64)
                    .prop_map(|(a, b, c, d)| [a, b, c, d]),
                slot in 0usize..4,
                bad in non_finite()
            ) {
                let mut inputs = inputs;
                inputs[slot] = bad;
                let [lat_a, lon_a, lat_b, lon_b] = inputs;
                prop_assert_eq!(haversine_m(lat_a, lon_a, lat_b, lon_b), f64::INFINITY);
            }

            #[test]
            fn same_meridian_distance_is_arc_length(
                lat_a in -60.0..=60.0f64,
                lat_b in -60.0..=60.0f64,
                lon in -180.0..=180.0f64
            ) {
                let expected = EARTH_RADIUS_M * (lat_b - lat_a).abs().to_radians();
                prop_assert!((haversine_m(lat_a, lon, lat_b, lon) - expected).abs() < 1e-3);
            }

            #[test]
            fn valid_inputs_stay_within_half_circumference(
                lat_a in -90.0..=90.0f64,
                lon_a in -180.0..=180.0f64,
                lat_b in -90.0..=90.0f64,
                lon_b in -180.0..=180.0f64
            ) {
                let distance = haversine_m(lat_a, lon_a, lat_b, lon_b);
                prop_assert!(distance.is_finite());
                prop_assert!((0.0..=std::f64::consts::PI * EARTH_RADIUS_M + 1.0).contains(&distance));
            }

            #[test]
            fn kilometers_agree_with_meters(
                lat_a in -90.0..=90.0f64,
                lon_a in -180.0..=180.0f64,
                lat_b in -90.0..=90.0f64,
                lon_b in -180.0..=180.0f64
            ) {
                let a = Coordinate::new(lon_a, lat_a);
                let b = Coordinate::new(lon_b, lat_b);
                prop_assert!((haversine_km(a, b) * 1000.0 - haversine_m(lat_a, lon_a, lat_b, lon_b)).abs() < 1e-6);
            }
        }
    }
}
