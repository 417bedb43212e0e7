//! crates/attendance_core/src/range_gate.rs
//!
//! Decides, sample by sample, whether the device is close enough to the
//! reference site for the capture step to be enabled.

use chrono::{DateTime, Utc};

use crate::domain::{EligibilityResult, PositionSample, ReferenceSite};
use crate::geo::haversine_distance;

/// Compares one sample against a site. The boundary is inclusive.
pub fn evaluate(sample: &PositionSample, site: &ReferenceSite) -> EligibilityResult {
    let distance_meters = haversine_distance(sample.point, site.point);
    EligibilityResult {
        distance_meters,
        within_range: distance_meters <= site.radius_meters,
    }
}

/// The eligibility currently shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    /// No sample has arrived yet.
    Pending,
    Evaluated(EligibilityResult),
    /// The sensor reported an error; the gate stays closed for this attempt.
    Unavailable(String),
}

impl Eligibility {
    pub fn within_range(&self) -> bool {
        matches!(self, Self::Evaluated(r) if r.within_range)
    }

    pub fn result(&self) -> Option<EligibilityResult> {
        match self {
            Self::Evaluated(r) => Some(*r),
            _ => None,
        }
    }
}

/// What happened to an observed sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    Applied(EligibilityResult),
    /// A newer sample was already applied, or the gate has failed closed.
    Ignored,
}

/// Tracks the latest sample for one reference site.
#[derive(Debug, Clone)]
pub struct RangeGate {
    site: ReferenceSite,
    eligibility: Eligibility,
    latest_at: Option<DateTime<Utc>>,
}

impl RangeGate {
    pub fn new(site: ReferenceSite) -> Self {
        Self {
            site,
            eligibility: Eligibility::Pending,
            latest_at: None,
        }
    }

    pub fn site(&self) -> &ReferenceSite {
        &self.site
    }

    pub fn eligibility(&self) -> &Eligibility {
        &self.eligibility
    }

    pub fn within_range(&self) -> bool {
        self.eligibility.within_range()
    }

    /// Re-evaluates against `sample` unless it is older than the last one applied.
    pub fn observe(&mut self, sample: &PositionSample) -> Observation {
        if matches!(self.eligibility, Eligibility::Unavailable(_)) {
            return Observation::Ignored;
        }
        if self.latest_at.is_some_and(|t| sample.captured_at < t) {
            return Observation::Ignored;
        }
        let result = evaluate(sample, &self.site);
        self.latest_at = Some(sample.captured_at);
        self.eligibility = Eligibility::Evaluated(result);
        Observation::Applied(result)
    }

    /// Fails closed: nothing re-opens the gate until `reset`.
    pub fn sensor_failed(&mut self, reason: impl Into<String>) {
        self.eligibility = Eligibility::Unavailable(reason.into());
    }

    /// Forgets every sample and failure, for a fresh attempt.
    pub fn reset(&mut self) {
        self.eligibility = Eligibility::Pending;
        self.latest_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoPoint;
    use crate::geo::EARTH_RADIUS_METERS;
    use chrono::TimeZone;

    const OFFICE_LAT: f64 = -6.245358;
    const OFFICE_LON: f64 = 106.872379;

    fn office(radius: f64) -> ReferenceSite {
        ReferenceSite::new("HQ", GeoPoint::new(OFFICE_LAT, OFFICE_LON).unwrap(), radius)
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    /// A sample `meters` due south of the office.
    fn sample_south(meters: f64, seconds: i64) -> PositionSample {
        let degrees = (meters / EARTH_RADIUS_METERS).to_degrees();
        PositionSample {
            point: GeoPoint::new(OFFICE_LAT - degrees, OFFICE_LON).unwrap(),
            accuracy_meters: 5.0,
            captured_at: at(seconds),
        }
    }

    #[test]
    fn same_point_is_in_range() {
        let sample = PositionSample {
            point: GeoPoint::new(OFFICE_LAT, OFFICE_LON).unwrap(),
            accuracy_meters: 3.0,
            captured_at: at(0),
        };
        let result = evaluate(&sample, &office(100.0));
        assert_eq!(result.distance_meters, 0.0);
        assert!(result.within_range);
    }

    #[test]
    fn far_sample_is_out_of_range() {
        let sample = PositionSample {
            point: GeoPoint::new(-6.24671, OFFICE_LON).unwrap(),
            accuracy_meters: 3.0,
            captured_at: at(0),
        };
        let result = evaluate(&sample, &office(100.0));
        assert!(result.distance_meters > 100.0);
        assert!(!result.within_range);
    }

    #[test]
    fn boundary_is_inclusive() {
        let site = office(100.0);
        let sample = sample_south(100.0, 0);
        // Use the computed distance as the radius so the comparison hits equality exactly.
        let exact = haversine_distance(sample.point, site.point);
        let site = ReferenceSite::new("HQ", site.point, exact);
        assert!(evaluate(&sample, &site).within_range);

        let beyond = sample_south(exact + 1.0, 0);
        assert!(!evaluate(&beyond, &site).within_range);
    }

    #[test]
    fn display_rounds_but_comparison_does_not() {
        let site = office(100.0);
        let sample = sample_south(100.4, 0);
        let result = evaluate(&sample, &site);
        assert_eq!(result.display_meters(), 100);
        assert!(!result.within_range);
    }

    #[test]
    fn gate_starts_closed() {
        let gate = RangeGate::new(office(100.0));
        assert_eq!(gate.eligibility(), &Eligibility::Pending);
        assert!(!gate.within_range());
    }

    #[test]
    fn gate_follows_the_newest_sample() {
        let mut gate = RangeGate::new(office(100.0));
        assert!(matches!(gate.observe(&sample_south(120.0, 0)), Observation::Applied(_)));
        assert!(!gate.within_range());
        gate.observe(&sample_south(80.0, 1));
        assert!(gate.within_range());
        gate.observe(&sample_south(130.0, 2));
        assert!(!gate.within_range());
    }

    #[test]
    fn late_delivery_of_an_older_sample_is_ignored() {
        let mut gate = RangeGate::new(office(100.0));
        let s1 = sample_south(120.0, 0);
        let s2 = sample_south(80.0, 1);

        gate.observe(&s2);
        assert_eq!(gate.observe(&s1), Observation::Ignored);
        assert!(gate.within_range());
        let shown = gate.eligibility().result().unwrap();
        assert!(shown.distance_meters < 100.0);
    }

    #[test]
    fn sensor_failure_fails_closed() {
        let mut gate = RangeGate::new(office(100.0));
        gate.observe(&sample_south(10.0, 0));
        assert!(gate.within_range());

        gate.sensor_failed("permission denied");
        assert!(!gate.within_range());
        assert_eq!(gate.observe(&sample_south(10.0, 5)), Observation::Ignored);
        assert!(!gate.within_range());

        gate.reset();
        gate.observe(&sample_south(10.0, 6));
        assert!(gate.within_range());
    }
}
