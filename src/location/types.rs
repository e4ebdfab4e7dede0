//! Location data types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single resolved position fix.
///
/// Immutable value produced at ingress from host payloads. Accuracy is the
/// 1-sigma radius in meters reported by the platform.
///
/// # Example
///
/// ```
/// use locus_core::location::Coordinate;
///
/// let fix = Coordinate::now(40.7128, -74.0060, 12.0);
/// assert!(fix.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,

    /// Horizontal accuracy radius in meters
    pub accuracy: f64,

    /// When the fix was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

impl Coordinate {
    /// Creates a fix with an explicit timestamp.
    #[must_use]
    pub const fn new(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
        }
    }

    /// Creates a fix stamped with the current time.
    #[must_use]
    pub fn now(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self::new(latitude, longitude, accuracy, Utc::now())
    }

    /// Returns true if latitude, longitude and accuracy are finite and in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.accuracy.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy >= 0.0
    }

    /// Age of this fix relative to `now`. Negative if the fix is from the future.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    /// Age of this fix relative to the current time.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.age_at(Utc::now())
    }
}

/// Where a fix came from, ordered by trust (`Gps` most trusted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSource {
    /// Satellite positioning
    Gps,
    /// Platform fused provider
    Fused,
    /// Cell / Wi-Fi positioning
    Network,
    /// Entered by the user
    Manual,
}

impl FixSource {
    /// All sources, most trusted first.
    pub const ALL: [Self; 4] = [Self::Gps, Self::Fused, Self::Network, Self::Manual];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gps => "gps",
            Self::Fused => "fused",
            Self::Network => "network",
            Self::Manual => "manual",
        }
    }

    /// Parses a host provider name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gps" | "satellite" => Some(Self::Gps),
            "fused" => Some(Self::Fused),
            "network" | "wifi" | "cell" => Some(Self::Network),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Trust component of the reliability score (0-30).
    #[must_use]
    pub const fn trust_score(self) -> u8 {
        match self {
            Self::Gps => 30,
            Self::Fused => 25,
            Self::Network => 15,
            Self::Manual => 5,
        }
    }
}

/// Quality tier derived from the accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl AccuracyQuality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

/// Coarse accuracy indicator for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyIndicator {
    High,
    Medium,
    Low,
}

/// Result of grading a fix's accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyAssessment {
    pub quality: AccuracyQuality,
    pub accuracy_indicator: AccuracyIndicator,
    /// Confidence in the fix, 0-100
    pub confidence_level: u8,
}

/// Plausibility verdict for a fix.
///
/// Validation failures are data, never errors: the caller decides whether
/// to accept a low-confidence fix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no issues.
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
        }
    }

    /// Records an issue that makes the fix unusable.
    pub fn reject(&mut self, issue: impl Into<String>) {
        self.is_valid = false;
        self.issues.push(issue.into());
    }

    /// Records an advisory issue without affecting validity.
    pub fn note(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }
}
