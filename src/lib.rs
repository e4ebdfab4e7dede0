//! Locus Core Library
//!
//! Device location subsystem: permission negotiation across host platforms,
//! tiered-accuracy acquisition, plausibility validation, a reliability-scored
//! cache and continuous foreground/background watching.
//!
//! Consumers go through [`LocationService`]; the host platform is plugged in
//! through the [`permission`] and [`position::PositionHost`] traits.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod cache;
pub mod config;
pub mod location;
pub mod permission;
pub mod position;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use api::{
    BackgroundPermissionResult, CacheStatus, LocationAvailability, LocationService,
    LocationStatus, ValidatedLocation,
};
pub use config::LocationConfig;
pub use location::Coordinate;
pub use position::{LocationError, LocationResult};
