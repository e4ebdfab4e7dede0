//! Property-based tests for geospatial math and fix validation.
//!
//! These tests verify:
//! - Haversine distance is symmetric, zero on identity and bounded
//! - Bearings always fall in [0, 360)
//! - Search-area bounds strictly enclose their center and stay in range
//! - Cache bucket keys do not depend on the sign of zero
//! - Accuracy grading and cache reliability stay within their ranges

use chrono::{Duration, Utc};
use locus_core::cache::{bucket_key, reliability_score};
use locus_core::location::{
    bearing_degrees, distance_km, search_area, AccuracyQuality, AccuracyValidator, Bounds,
    Coordinate, FixSource, LatLng,
};
use proptest::prelude::*;

/// Half the Earth's circumference, the largest possible great-circle distance.
const MAX_DISTANCE_KM: f64 = 20_015.1;

// ============================================================================
// Fixed reference values
// ============================================================================

/// New York to Boston is about 306 km, heading north-east.
#[test]
fn nyc_to_boston_distance_and_bearing() {
    let distance = distance_km(40.7128, -74.0060, 42.3601, -71.0589);
    assert!(
        (distance - 306.0).abs() <= 1.0,
        "NYC to Boston should be ~306 km, got {distance}"
    );

    let bearing = bearing_degrees(40.7128, -74.0060, 42.3601, -71.0589);
    assert!(
        bearing > 45.0 && bearing < 80.0,
        "NYC to Boston bearing should be north-east, got {bearing}"
    );
}

/// A fix five meters wide is excellent and valid.
#[test]
fn five_meter_fix_is_excellent() {
    let validator = AccuracyValidator::default();
    let fix = Coordinate::now(40.7128, -74.0060, 5.0);

    assert_eq!(validator.assess_accuracy(&fix).quality, AccuracyQuality::Excellent);
    assert!(validator.validate(&fix, None).is_valid);
}

/// A fix two kilometers wide is poor but still valid.
#[test]
fn two_kilometer_fix_is_poor_but_valid() {
    let validator = AccuracyValidator::default();
    let fix = Coordinate::now(40.7128, -74.0060, 2000.0);

    assert_eq!(validator.assess_accuracy(&fix).quality, AccuracyQuality::Poor);
    assert!(validator.validate(&fix, None).is_valid);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: distance does not depend on direction of travel.
    #[test]
    fn distance_is_symmetric(
        lat1 in -90.0f64..=90.0,
        lng1 in -180.0f64..=180.0,
        lat2 in -90.0f64..=90.0,
        lng2 in -180.0f64..=180.0,
    ) {
        let forward = distance_km(lat1, lng1, lat2, lng2);
        let backward = distance_km(lat2, lng2, lat1, lng1);
        prop_assert!((forward - backward).abs() < 1e-6);
    }

    /// Property: a point is zero kilometers from itself.
    #[test]
    fn distance_to_self_is_zero(
        lat in -90.0f64..=90.0,
        lng in -180.0f64..=180.0,
    ) {
        prop_assert!(distance_km(lat, lng, lat, lng).abs() < 1e-9);
    }

    /// Property: no two points are further apart than half the circumference.
    #[test]
    fn distance_is_bounded(
        lat1 in -90.0f64..=90.0,
        lng1 in -180.0f64..=180.0,
        lat2 in -90.0f64..=90.0,
        lng2 in -180.0f64..=180.0,
    ) {
        let distance = distance_km(lat1, lng1, lat2, lng2);
        prop_assert!(distance >= 0.0);
        prop_assert!(distance <= MAX_DISTANCE_KM);
    }

    /// Property: bearings are normalized into [0, 360).
    #[test]
    fn bearing_is_normalized(
        lat1 in -90.0f64..=90.0,
        lng1 in -180.0f64..=180.0,
        lat2 in -90.0f64..=90.0,
        lng2 in -180.0f64..=180.0,
    ) {
        let bearing = bearing_degrees(lat1, lng1, lat2, lng2);
        prop_assert!((0.0..360.0).contains(&bearing), "bearing {} out of range", bearing);
    }

    /// Property: search-area bounds strictly enclose the center away from
    /// the poles and the antimeridian.
    #[test]
    fn search_area_encloses_center(
        lat in -85.0f64..=85.0,
        lng in -170.0f64..=170.0,
        radius in 0.1f64..=50.0,
    ) {
        let center = LatLng::new(lat, lng);
        let area = search_area(center, radius);

        prop_assert!(area.bounds.northeast.latitude > lat);
        prop_assert!(area.bounds.northeast.longitude > lng);
        prop_assert!(area.bounds.southwest.latitude < lat);
        prop_assert!(area.bounds.southwest.longitude < lng);
        prop_assert!(area.contains(&center));
    }

    /// Property: search-area bounds stay within coordinate range and enclose
    /// the center, for any center and radius.
    #[test]
    fn search_area_bounds_stay_in_range(
        lat in -90.0f64..=90.0,
        lng in -180.0f64..=180.0,
        radius in 0.0f64..=25_000.0,
    ) {
        let center = LatLng::new(lat, lng);
        let area = search_area(center, radius);
        let Bounds { northeast, southwest } = area.bounds;

        for corner in [northeast, southwest] {
            prop_assert!((-90.0..=90.0).contains(&corner.latitude));
            prop_assert!((-180.0..=180.0).contains(&corner.longitude));
        }
        prop_assert!(area.contains(&center));
    }

    /// Property: fixes rounding to the same bucket share a key, including on
    /// either side of the equator and the prime meridian.
    #[test]
    fn bucket_key_ignores_sign_of_zero(
        lat in -0.000_49f64..0.000_49,
        lng in -0.000_49f64..0.000_49,
    ) {
        let fix = Coordinate::now(lat, lng, 10.0);
        prop_assert_eq!(bucket_key(&fix), "0.000,0.000");
    }

    /// Property: confidence never increases as accuracy gets worse.
    #[test]
    fn confidence_is_monotonic(
        a in 0.0f64..10_000.0,
        b in 0.0f64..10_000.0,
    ) {
        let validator = AccuracyValidator::default();
        let (tight, loose) = if a <= b { (a, b) } else { (b, a) };
        let tight = validator.assess_accuracy(&Coordinate::now(0.0, 0.0, tight));
        let loose = validator.assess_accuracy(&Coordinate::now(0.0, 0.0, loose));
        prop_assert!(tight.confidence_level >= loose.confidence_level);
        prop_assert!(tight.confidence_level <= 100);
    }

    /// Property: reliability scores are always within [0, 100].
    #[test]
    fn reliability_is_bounded(
        accuracy in 0.0f64..100_000.0,
        age_secs in 0i64..1_000_000,
        source_idx in 0usize..4,
    ) {
        let now = Utc::now();
        let fix = Coordinate::new(10.0, 10.0, accuracy, now - Duration::seconds(age_secs));
        let score = reliability_score(&fix, FixSource::ALL[source_idx], now);
        prop_assert!(score <= 100);
    }

    /// Property: fixes at the same place are never flagged as teleportation,
    /// whatever their time gap.
    #[test]
    fn stationary_fixes_are_plausible(
        lat in -89.0f64..=89.0,
        lng in -179.0f64..=179.0,
        gap_ms in 0i64..3_600_000,
    ) {
        let validator = AccuracyValidator::default();
        let now = Utc::now();
        let previous = Coordinate::new(lat, lng, 10.0, now - Duration::milliseconds(gap_ms));
        let current = Coordinate::new(lat, lng, 10.0, now);
        prop_assert!(validator.validate(&current, Some(&previous)).is_valid);
    }
}
