//! Accuracy grading and plausibility validation of fixes.
//!
//! Grading and validation are independent: a poor-quality fix can still be
//! valid, and an excellent fix can be rejected for implausible movement.

use chrono::Duration;

use super::geo::distance_km;
use super::types::{
    AccuracyAssessment, AccuracyIndicator, AccuracyQuality, Coordinate, ValidationResult,
};
use crate::config::ValidationConfig;

/// Issue reported when two fixes imply an impossible travel speed.
pub const TELEPORTATION_ISSUE: &str = "Impossible movement detected (teleportation)";

/// Shortest elapsed time used when deriving speed between two fixes.
const MIN_ELAPSED_SECS: f64 = 1.0;

/// Tolerated clock skew before a future timestamp is reported.
const FUTURE_SKEW: Duration = Duration::seconds(60);

/// Grades and validates fixes against configured thresholds.
#[derive(Debug, Clone, Default)]
pub struct AccuracyValidator {
    config: ValidationConfig,
}

impl AccuracyValidator {
    #[must_use]
    pub const fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Grades a fix by its accuracy radius.
    ///
    /// # Examples
    ///
    /// ```
    /// use locus_core::location::{AccuracyQuality, AccuracyValidator, Coordinate};
    ///
    /// let validator = AccuracyValidator::default();
    /// let assessment = validator.assess_accuracy(&Coordinate::now(0.0, 0.0, 5.0));
    /// assert_eq!(assessment.quality, AccuracyQuality::Excellent);
    /// ```
    #[must_use]
    pub fn assess_accuracy(&self, location: &Coordinate) -> AccuracyAssessment {
        let radius = location.accuracy;
        let cfg = &self.config;

        let (quality, accuracy_indicator, confidence_level) = if radius <= cfg.excellent_max_m {
            (AccuracyQuality::Excellent, AccuracyIndicator::High, 95)
        } else if radius <= cfg.good_max_m {
            (AccuracyQuality::Good, AccuracyIndicator::High, 85)
        } else if radius <= cfg.fair_max_m {
            (AccuracyQuality::Fair, AccuracyIndicator::Medium, 70)
        } else {
            (AccuracyQuality::Poor, AccuracyIndicator::Low, poor_confidence(radius))
        };

        AccuracyAssessment {
            quality,
            accuracy_indicator,
            confidence_level,
        }
    }

    /// Checks a fix for usability and, given the previous fix, for plausible
    /// movement.
    #[must_use]
    pub fn validate(
        &self,
        location: &Coordinate,
        previous: Option<&Coordinate>,
    ) -> ValidationResult {
        let mut result = ValidationResult::valid();

        if !location.is_valid() {
            result.reject(format!(
                "Coordinates out of range ({}, {}, ±{} m)",
                location.latitude, location.longitude, location.accuracy
            ));
            return result;
        }

        if location.accuracy > self.config.max_usable_accuracy_m {
            result.reject(format!(
                "Accuracy too low to be usable ({:.0} m)",
                location.accuracy
            ));
        } else if location.accuracy > self.config.fair_max_m {
            result.note(format!("Low accuracy ({:.0} m)", location.accuracy));
        }

        if location.age().num_milliseconds() < -FUTURE_SKEW.num_milliseconds() {
            result.note("Location timestamp is in the future");
        }

        if let Some(prev) = previous.filter(|p| p.is_valid()) {
            if let Some(speed) = implied_speed_kmh(prev, location) {
                if speed > self.config.max_speed_kmh {
                    result.reject(TELEPORTATION_ISSUE);
                }
            }
        }

        result
    }
}

/// Confidence for poor fixes, non-increasing with radius and below 50.
fn poor_confidence(radius: f64) -> u8 {
    if radius <= 500.0 {
        40
    } else if radius <= 1000.0 {
        25
    } else {
        10
    }
}

/// Travel speed in km/h implied by moving from `from` to `to`.
///
/// Elapsed time is taken as an absolute value and floored at one second, so
/// out-of-order or simultaneous fixes are still checked.
#[allow(clippy::cast_precision_loss)]
fn implied_speed_kmh(from: &Coordinate, to: &Coordinate) -> Option<f64> {
    let distance = distance_km(from.latitude, from.longitude, to.latitude, to.longitude);
    if !distance.is_finite() {
        return None;
    }
    let elapsed_ms = (to.timestamp - from.timestamp).num_milliseconds().abs();
    let elapsed_secs = (elapsed_ms as f64 / 1000.0).max(MIN_ELAPSED_SECS);
    Some(distance / (elapsed_secs / 3600.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fix(lat: f64, lng: f64, accuracy: f64) -> Coordinate {
        Coordinate::now(lat, lng, accuracy)
    }

    #[test]
    fn assess_excellent_at_five_meters() {
        let assessment = AccuracyValidator::default().assess_accuracy(&fix(0.0, 0.0, 5.0));
        assert_eq!(assessment.quality, AccuracyQuality::Excellent);
        assert_eq!(assessment.accuracy_indicator, AccuracyIndicator::High);
        assert_eq!(assessment.confidence_level, 95);
    }

    #[test]
    fn assess_tiers_at_cut_points() {
        let v = AccuracyValidator::default();
        assert_eq!(v.assess_accuracy(&fix(0.0, 0.0, 10.0)).quality, AccuracyQuality::Excellent);
        assert_eq!(v.assess_accuracy(&fix(0.0, 0.0, 10.5)).quality, AccuracyQuality::Good);
        assert_eq!(v.assess_accuracy(&fix(0.0, 0.0, 50.0)).quality, AccuracyQuality::Good);
        assert_eq!(v.assess_accuracy(&fix(0.0, 0.0, 100.0)).quality, AccuracyQuality::Fair);
        assert_eq!(v.assess_accuracy(&fix(0.0, 0.0, 100.1)).quality, AccuracyQuality::Poor);
    }

    #[test]
    fn assess_confidence_is_monotonic() {
        let v = AccuracyValidator::default();
        let radii = [0.0, 5.0, 10.0, 30.0, 50.0, 80.0, 100.0, 300.0, 800.0, 2000.0, 9000.0];
        let confidences: Vec<u8> = radii
            .iter()
            .map(|r| v.assess_accuracy(&fix(0.0, 0.0, *r)).confidence_level)
            .collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
        assert!(*confidences.last().unwrap() < 50);
    }

    #[test]
    fn validate_accepts_excellent_fix() {
        let result = AccuracyValidator::default().validate(&fix(40.0, -74.0, 5.0), None);
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn validate_poor_fix_is_still_valid() {
        let v = AccuracyValidator::default();
        let location = fix(40.0, -74.0, 2000.0);
        assert_eq!(v.assess_accuracy(&location).quality, AccuracyQuality::Poor);

        let result = v.validate(&location, None);
        assert!(result.is_valid);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn validate_rejects_beyond_usable_ceiling() {
        let result = AccuracyValidator::default().validate(&fix(40.0, -74.0, 5001.0), None);
        assert!(!result.is_valid);
        assert!(result.issues[0].contains("too low"));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let result = AccuracyValidator::default().validate(&fix(120.0, 0.0, 5.0), None);
        assert!(!result.is_valid);
    }

    #[test]
    fn validate_flags_teleportation() {
        let now = Utc::now();
        let nyc = Coordinate::new(40.7128, -74.0060, 5.0, now - Duration::seconds(1));
        let tokyo = Coordinate::new(35.6762, 139.6503, 5.0, now);

        let result = AccuracyValidator::default().validate(&tokyo, Some(&nyc));
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i == TELEPORTATION_ISSUE));
    }

    #[test]
    fn validate_allows_highway_speed() {
        let now = Utc::now();
        let a = Coordinate::new(40.7128, -74.0060, 5.0, now - Duration::minutes(10));
        // ~20 km north in 10 minutes = ~120 km/h
        let b = Coordinate::new(40.8928, -74.0060, 5.0, now);

        let result = AccuracyValidator::default().validate(&b, Some(&a));
        assert!(result.is_valid);
    }

    #[test]
    fn validate_simultaneous_far_fixes_are_flagged() {
        let now = Utc::now();
        let a = Coordinate::new(0.0, 0.0, 5.0, now);
        let b = Coordinate::new(1.0, 0.0, 5.0, now);

        let result = AccuracyValidator::default().validate(&b, Some(&a));
        assert!(!result.is_valid);
    }

    #[test]
    fn validate_notes_future_timestamp() {
        let location = Coordinate::new(0.0, 0.0, 5.0, Utc::now() + Duration::minutes(5));
        let result = AccuracyValidator::default().validate(&location, None);
        assert!(result.is_valid);
        assert!(result.issues.iter().any(|i| i.contains("future")));
    }
}
