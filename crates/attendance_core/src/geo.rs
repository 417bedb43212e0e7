//! crates/attendance_core/src/geo.rs
//!
//! Great-circle distance between two points, using the haversine formula.

use crate::domain::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Returns the great-circle distance between `a` and `b` in meters.
///
/// Identical points yield exactly `0.0`; antipodal points yield roughly
/// `π · EARTH_RADIUS_METERS`.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude().to_radians();
    let phi2 = b.latitude().to_radians();
    let delta_phi = (b.latitude() - a.latitude()).to_radians();
    let delta_lambda = (b.longitude() - a.longitude()).to_radians();

    let sin_phi = (delta_phi / 2.0).sin();
    let sin_lambda = (delta_lambda / 2.0).sin();
    let h = sin_phi * sin_phi + phi1.cos() * phi2.cos() * sin_lambda * sin_lambda;
    // Rounding can push h a hair past 1 near the antipode.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn coincident_points_are_zero() {
        let office = point(-6.245358, 106.872379);
        assert_eq!(haversine_distance(office, office), 0.0);
        assert_eq!(haversine_distance(point(90.0, 0.0), point(90.0, 0.0)), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_distance(point(0.0, 0.0), point(1.0, 0.0));
        let expected = EARTH_RADIUS_METERS * PI / 180.0;
        assert!((d - expected).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn antipodal_points_are_half_the_circumference() {
        let d = haversine_distance(point(0.0, 0.0), point(0.0, 180.0));
        assert!((d - PI * EARTH_RADIUS_METERS).abs() < 1.0, "got {d}");

        let poles = haversine_distance(point(90.0, 0.0), point(-90.0, 0.0));
        assert!(poles.is_finite());
        assert!((poles - PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn office_neighbourhood() {
        let office = point(-6.245358, 106.872379);
        let south = point(-6.24671, 106.872379);
        let d = haversine_distance(office, south);
        assert!(d > 140.0 && d < 160.0, "got {d}");
    }
}
