//! Geospatial math: great-circle distance, initial bearing and search areas.
//!
//! All functions are pure. Distances use a spherical Earth, which is well
//! within the accuracy of consumer positioning hardware.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude.
const KM_PER_DEGREE_LAT: f64 = 110.574;

/// Kilometers per degree of longitude at the equator.
const KM_PER_DEGREE_LNG: f64 = 111.320;

/// Floor for cos(latitude) so longitude spans stay finite near the poles.
const MIN_COS_LAT: f64 = 1e-6;

/// Decimal places used to quantize coordinates into cache buckets (~110 m).
pub const BUCKET_DECIMALS: i32 = 3;

/// Great-circle distance between two points in kilometers (haversine).
///
/// # Examples
///
/// ```
/// use locus_core::location::geo::distance_km;
///
/// // New York to Boston
/// let d = distance_km(40.7128, -74.0060, 42.3601, -71.0589);
/// assert!((d - 306.0).abs() < 1.0);
/// ```
#[must_use]
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Initial bearing from the first point towards the second, in `[0, 360)`.
#[must_use]
pub fn bearing_degrees(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs.
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Rounds a coordinate component to the cache bucket precision.
///
/// Non-finite input yields 0.0. Values that round to zero yield positive
/// zero, so both sides of the equator and the prime meridian share a bucket.
#[must_use]
pub fn quantize(component: f64) -> f64 {
    if !component.is_finite() {
        return 0.0;
    }
    let multiplier = 10_f64.powi(BUCKET_DECIMALS);
    let rounded = (component * multiplier).round() / multiplier;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// A latitude/longitude pair without accuracy or time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Distance to another point in kilometers.
    #[must_use]
    pub fn distance_km_to(&self, other: &Self) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl From<&super::Coordinate> for LatLng {
    fn from(c: &super::Coordinate) -> Self {
        Self::new(c.latitude, c.longitude)
    }
}

/// Rectangular bounds of a search area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub northeast: LatLng,
    pub southwest: LatLng,
}

/// A circular search area with a bounding box for coarse pre-filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchArea {
    pub center: LatLng,
    /// Radius in kilometers
    pub radius: f64,
    pub bounds: Bounds,
}

impl SearchArea {
    /// Returns true if `point` falls inside the bounding box.
    ///
    /// This is a coarse check; follow it with [`distance_km`] for exact radius
    /// membership.
    #[must_use]
    pub fn contains(&self, point: &LatLng) -> bool {
        let Bounds {
            northeast,
            southwest,
        } = self.bounds;
        (southwest.latitude..=northeast.latitude).contains(&point.latitude)
            && (southwest.longitude..=northeast.longitude).contains(&point.longitude)
    }

    /// Returns true if `point` lies within `radius` kilometers of the center.
    #[must_use]
    pub fn within_radius(&self, point: &LatLng) -> bool {
        self.contains(point) && self.center.distance_km_to(point) <= self.radius
    }
}

/// Builds a search area around `center` using a flat-earth degree-per-km
/// approximation at the center latitude.
///
/// Bounds never leave the coordinate range. Latitude is clamped at the
/// poles, and an area that reaches a pole or crosses the antimeridian spans
/// every longitude. Within those limits, a positive radius gives a northeast
/// corner strictly greater than the center on both axes and a southwest
/// corner strictly less.
///
/// A zero, negative or NaN radius is treated as zero: the bounds collapse
/// onto the center.
#[must_use]
pub fn search_area(center: LatLng, radius_km: f64) -> SearchArea {
    let radius_km = if radius_km > 0.0 { radius_km } else { 0.0 };
    let lat_delta = radius_km / KM_PER_DEGREE_LAT;
    let cos_lat = center.latitude.to_radians().cos().abs().max(MIN_COS_LAT);
    let lng_delta = (radius_km / (KM_PER_DEGREE_LNG * cos_lat)).min(180.0);

    let north = center.latitude + lat_delta;
    let south = center.latitude - lat_delta;
    let east = center.longitude + lng_delta;
    let west = center.longitude - lng_delta;

    let (west, east) = if north > 90.0 || south < -90.0 || east > 180.0 || west < -180.0 {
        (-180.0, 180.0)
    } else {
        (west, east)
    };

    SearchArea {
        center,
        radius: radius_km,
        bounds: Bounds {
            northeast: LatLng::new(north.min(90.0), east),
            southwest: LatLng::new(south.max(-90.0), west),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NYC: (f64, f64) = (40.7128, -74.0060);
    const BOSTON: (f64, f64) = (42.3601, -71.0589);
    const TOKYO: (f64, f64) = (35.6762, 139.6503);

    #[test]
    fn distance_nyc_to_boston() {
        let d = distance_km(NYC.0, NYC.1, BOSTON.0, BOSTON.1);
        assert!((d - 306.0).abs() <= 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_km(NYC.0, NYC.1, TOKYO.0, TOKYO.1);
        let ba = distance_km(TOKYO.0, TOKYO.1, NYC.0, NYC.1);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(NYC.0, NYC.1, NYC.0, NYC.1), 0.0);
    }

    #[test]
    fn distance_antipodal_is_half_circumference() {
        let d = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn bearing_nyc_to_boston_is_northeast() {
        let b = bearing_degrees(NYC.0, NYC.1, BOSTON.0, BOSTON.1);
        assert!(b > 45.0 && b < 80.0, "got {b}");
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert!((bearing_degrees(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((bearing_degrees(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((bearing_degrees(1.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((bearing_degrees(0.0, 1.0, 0.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_same_point_is_in_range() {
        let b = bearing_degrees(NYC.0, NYC.1, NYC.0, NYC.1);
        assert!((0.0..360.0).contains(&b));
    }

    #[test]
    fn quantize_rounds_to_three_decimals() {
        assert_eq!(quantize(40.712_84), 40.713);
        assert_eq!(quantize(-74.006_04), -74.006);
        assert_eq!(quantize(f64::NAN), 0.0);
    }

    #[test]
    fn search_area_bounds_are_strict() {
        let center = LatLng::new(NYC.0, NYC.1);
        let area = search_area(center, 5.0);

        assert!(area.bounds.northeast.latitude > center.latitude);
        assert!(area.bounds.northeast.longitude > center.longitude);
        assert!(area.bounds.southwest.latitude < center.latitude);
        assert!(area.bounds.southwest.longitude < center.longitude);
        assert_eq!(area.radius, 5.0);
    }

    #[test]
    fn search_area_lat_span_matches_radius() {
        let area = search_area(LatLng::new(0.0, 0.0), 10.0);
        let north_edge = LatLng::new(area.bounds.northeast.latitude, 0.0);
        let d = area.center.distance_km_to(&north_edge);
        assert!((d - 10.0).abs() < 0.1, "got {d}");
    }

    #[test]
    fn quantize_normalizes_negative_zero() {
        assert!(quantize(-0.0001).is_sign_positive());
        assert!(quantize(-0.0).is_sign_positive());
        assert_eq!(format!("{:.3}", quantize(-0.0004)), "0.000");
    }

    #[test]
    fn search_area_near_pole_stays_finite() {
        let area = search_area(LatLng::new(89.9999, 10.0), 50.0);
        assert!(area.bounds.northeast.longitude.is_finite());
        assert!(area.bounds.southwest.longitude.is_finite());
        assert!(area.bounds.northeast.longitude > 10.0);
    }

    #[test]
    fn search_area_over_pole_is_clamped() {
        let area = search_area(LatLng::new(89.99, 10.0), 50.0);

        assert_eq!(area.bounds.northeast, LatLng::new(90.0, 180.0));
        assert_eq!(area.bounds.southwest.longitude, -180.0);
        assert!(area.bounds.southwest.latitude < 89.99);
        assert!(area.contains(&LatLng::new(89.995, -170.0)));
    }

    #[test]
    fn search_area_across_antimeridian_spans_all_longitudes() {
        let area = search_area(LatLng::new(0.0, 179.99), 10.0);

        assert_eq!(area.bounds.northeast.longitude, 180.0);
        assert_eq!(area.bounds.southwest.longitude, -180.0);
        assert!(area.contains(&LatLng::new(0.0, -179.99)));
    }

    #[test]
    fn search_area_non_positive_radius_collapses_to_center() {
        let center = LatLng::new(NYC.0, NYC.1);
        for radius in [0.0, -5.0, f64::NAN] {
            let area = search_area(center, radius);
            assert_eq!(area.radius, 0.0);
            assert_eq!(area.bounds.northeast, center);
            assert_eq!(area.bounds.southwest, center);
            assert!(area.contains(&center));
        }
    }

    #[test]
    fn search_area_contains_prefilter() {
        let area = search_area(LatLng::new(NYC.0, NYC.1), 2.0);
        assert!(area.contains(&LatLng::new(40.72, -74.0)));
        assert!(!area.contains(&LatLng::new(BOSTON.0, BOSTON.1)));
        assert!(area.within_radius(&LatLng::new(40.713, -74.006)));
    }
}
