//! Location values, geospatial math and fix validation.
//!
//! Provides the pure building blocks of the subsystem:
//! - [`Coordinate`]: an immutable fix with accuracy and timestamp
//! - [`geo`]: haversine distance, initial bearing and search-area bounds
//! - [`AccuracyValidator`]: quality grading and plausibility checks
//!
//! # Example Usage
//!
//! ```
//! use chrono::{Duration, Utc};
//! use locus_core::location::{AccuracyValidator, Coordinate};
//!
//! let validator = AccuracyValidator::default();
//!
//! let now = Utc::now();
//! let previous = Coordinate::new(40.7128, -74.0060, 8.0, now - Duration::seconds(1));
//! let current = Coordinate::new(35.6762, 139.6503, 8.0, now);
//!
//! // New York to Tokyo in one second is not plausible
//! let result = validator.validate(&current, Some(&previous));
//! assert!(!result.is_valid);
//! ```

pub mod geo;
pub mod types;
pub mod validator;

pub use geo::{bearing_degrees, distance_km, search_area, Bounds, LatLng, SearchArea};
pub use types::{
    AccuracyAssessment, AccuracyIndicator, AccuracyQuality, Coordinate, FixSource,
    ValidationResult,
};
pub use validator::{AccuracyValidator, TELEPORTATION_ISSUE};
