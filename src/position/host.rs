//! Host position API boundary.
//!
//! The platform delivers fixes through callbacks with loosely typed
//! payloads. Payloads are deserialized into [`HostPosition`] and converted
//! to [`Coordinate`] here, so nothing past this module sees raw host data.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use super::error::{LocationError, LocationResult};
use crate::config::{AccuracyMode, WatchOptions};
use crate::location::{Coordinate, FixSource};

/// Accuracy assumed when the host omits one.
pub const UNKNOWN_ACCURACY_M: f64 = 5_000.0;

/// Coordinates portion of a host payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostCoords {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// A fix as delivered by the host bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPosition {
    pub coords: HostCoords,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub provider: Option<String>,
}

impl HostPosition {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp_ms: i64) -> Self {
        Self {
            coords: HostCoords {
                latitude,
                longitude,
                accuracy: Some(accuracy),
            },
            timestamp: timestamp_ms,
            provider: None,
        }
    }

    /// Sets the provider name reported by the host.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Parses a JSON payload from the host bridge.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Unavailable`] if the payload is malformed.
    pub fn from_json(json: &str) -> LocationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LocationError::Unavailable(format!("Malformed position payload: {e}")))
    }

    /// Converts the payload into a checked [`Coordinate`].
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Unavailable`] if the timestamp is out of
    /// range or any coordinate value is non-finite or out of range.
    pub fn to_coordinate(&self) -> LocationResult<Coordinate> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(self.timestamp).ok_or_else(|| {
            LocationError::Unavailable(format!("Invalid position timestamp: {}", self.timestamp))
        })?;
        let coordinate = Coordinate::new(
            self.coords.latitude,
            self.coords.longitude,
            self.coords.accuracy.unwrap_or(UNKNOWN_ACCURACY_M),
            timestamp,
        );
        if !coordinate.is_valid() {
            return Err(LocationError::Unavailable(format!(
                "Invalid position payload: ({}, {}) ±{}",
                coordinate.latitude, coordinate.longitude, coordinate.accuracy
            )));
        }
        Ok(coordinate)
    }

    /// Source named by the host, if recognized.
    #[must_use]
    pub fn source(&self) -> Option<FixSource> {
        self.provider.as_deref().and_then(FixSource::parse)
    }

    /// Source named by the host, else the one implied by `mode`.
    #[must_use]
    pub fn source_or(&self, mode: AccuracyMode) -> FixSource {
        self.source().unwrap_or_else(|| default_source(mode))
    }
}

/// Source attributed to a fix when the host does not name one.
#[must_use]
pub const fn default_source(mode: AccuracyMode) -> FixSource {
    match mode {
        AccuracyMode::High => FixSource::Gps,
        AccuracyMode::Balanced => FixSource::Fused,
        AccuracyMode::Low => FixSource::Network,
    }
}

/// Error reported by the host position API.
///
/// Codes follow the W3C geolocation numbering with platform extensions.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Host position error {code}: {message}")]
pub struct HostPositionError {
    pub code: i32,
    pub message: String,
}

impl HostPositionError {
    pub const PERMISSION_DENIED: i32 = 1;
    pub const POSITION_UNAVAILABLE: i32 = 2;
    pub const TIMEOUT: i32 = 3;
    pub const PLAY_SERVICE_NOT_AVAILABLE: i32 = 4;
    pub const SETTINGS_NOT_SATISFIED: i32 = 5;
    pub const INTERNAL_ERROR: i32 = -1;

    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn permission_denied() -> Self {
        Self::new(Self::PERMISSION_DENIED, "Location permission denied")
    }

    #[must_use]
    pub fn position_unavailable() -> Self {
        Self::new(Self::POSITION_UNAVAILABLE, "Position unavailable")
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self::new(Self::TIMEOUT, "Position request timed out")
    }

    /// True if the user revoked location access.
    #[must_use]
    pub const fn is_permission_revoked(&self) -> bool {
        self.code == Self::PERMISSION_DENIED
    }
}

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub accuracy: AccuracyMode,
    pub timeout: Duration,
    /// Oldest platform-cached fix the host may answer with
    pub maximum_age: Duration,
}

/// Host-assigned identifier of a continuous watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(pub u64);

/// Which location providers the device has enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub gps_enabled: bool,
    pub network_enabled: bool,
}

impl ProviderStatus {
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.gps_enabled || self.network_enabled
    }
}

/// Outcome delivered to a position callback.
pub type PositionUpdate = Result<HostPosition, HostPositionError>;

/// One-shot callback for [`PositionHost::get_current_position`].
pub type PositionCallback = Box<dyn FnOnce(PositionUpdate) + Send>;

/// Repeating callback for [`PositionHost::watch_position`].
pub type WatchCallback = Arc<dyn Fn(PositionUpdate) + Send + Sync>;

/// Host position API.
///
/// Callbacks may be invoked synchronously from inside the registering call
/// or later from any thread.
pub trait PositionHost: Send + Sync {
    /// Requests one fix. The callback is invoked at most once.
    fn get_current_position(&self, options: &PositionOptions, callback: PositionCallback);

    /// Starts continuous updates.
    ///
    /// # Errors
    ///
    /// Returns the host error if the watch could not be registered.
    fn watch_position(
        &self,
        options: &WatchOptions,
        callback: WatchCallback,
    ) -> Result<WatchId, HostPositionError>;

    /// Stops a watch. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);

    /// Reports which providers are enabled.
    fn provider_status(
        &self,
    ) -> impl Future<Output = Result<ProviderStatus, HostPositionError>> + Send;
}

/// Requests one fix and waits for it, bounded by `options.timeout`.
///
/// A result that arrives after the deadline is discarded.
///
/// # Errors
///
/// Returns [`LocationError::Timeout`] if the deadline passes first, or the
/// host error mapped through [`LocationError::from`].
pub async fn request_position<H: PositionHost>(
    host: &H,
    options: &PositionOptions,
) -> LocationResult<HostPosition> {
    let (tx, rx) = oneshot::channel();
    host.get_current_position(
        options,
        Box::new(move |update| {
            // Receiver is gone once the deadline has passed.
            let _ = tx.send(update);
        }),
    );

    match tokio::time::timeout(options.timeout, rx).await {
        Ok(Ok(Ok(position))) => Ok(position),
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(_)) => Err(LocationError::Unavailable(
            "Position callback dropped without a result".to_string(),
        )),
        Err(_) => Err(LocationError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPositionHost;

    fn options(timeout_ms: u64) -> PositionOptions {
        PositionOptions {
            accuracy: AccuracyMode::High,
            timeout: Duration::from_millis(timeout_ms),
            maximum_age: Duration::ZERO,
        }
    }

    #[test]
    fn parses_bridge_payload() {
        let json = r#"{
            "coords": {"latitude": 40.7128, "longitude": -74.006, "accuracy": 12.5},
            "timestamp": 1700000000000,
            "provider": "fused"
        }"#;
        let position = HostPosition::from_json(json).unwrap();
        let coordinate = position.to_coordinate().unwrap();

        assert!((coordinate.accuracy - 12.5).abs() < f64::EPSILON);
        assert_eq!(coordinate.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(position.source(), Some(FixSource::Fused));
    }

    #[test]
    fn missing_accuracy_uses_fallback() {
        let json = r#"{"coords": {"latitude": 1.0, "longitude": 2.0}, "timestamp": 0}"#;
        let coordinate = HostPosition::from_json(json).unwrap().to_coordinate().unwrap();
        assert!((coordinate.accuracy - UNKNOWN_ACCURACY_M).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_payload_is_unavailable() {
        let err = HostPosition::from_json(r#"{"coords": "nope"}"#).unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
    }

    #[test]
    fn out_of_range_payload_rejected() {
        let position = HostPosition::new(123.0, 0.0, 5.0, 0);
        assert!(matches!(
            position.to_coordinate(),
            Err(LocationError::Unavailable(_))
        ));

        let position = HostPosition::new(f64::NAN, 0.0, 5.0, 0);
        assert!(position.to_coordinate().is_err());
    }

    #[test]
    fn source_falls_back_to_accuracy_mode() {
        let position = HostPosition::new(0.0, 0.0, 5.0, 0);
        assert_eq!(position.source_or(AccuracyMode::High), FixSource::Gps);
        assert_eq!(position.source_or(AccuracyMode::Low), FixSource::Network);

        let position = position.with_provider("wifi");
        assert_eq!(position.source_or(AccuracyMode::High), FixSource::Network);
    }

    #[test]
    fn host_error_display() {
        assert_eq!(
            HostPositionError::position_unavailable().to_string(),
            "Host position error 2: Position unavailable"
        );
    }

    #[test]
    fn only_code_one_is_revocation() {
        assert!(HostPositionError::permission_denied().is_permission_revoked());
        assert!(!HostPositionError::position_unavailable().is_permission_revoked());
        let internal = HostPositionError::new(HostPositionError::INTERNAL_ERROR, "x");
        assert!(!internal.is_permission_revoked());
    }

    #[tokio::test]
    async fn request_position_resolves_fix() {
        let host = MockPositionHost::new();
        host.push_fix(HostPosition::new(10.0, 20.0, 8.0, 1_000));

        let position = request_position(&host, &options(1_000)).await.unwrap();
        assert!((position.coords.latitude - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn request_position_maps_host_error() {
        let host = MockPositionHost::new();
        host.push_error(HostPositionError::permission_denied());

        let err = request_position(&host, &options(1_000)).await.unwrap_err();
        assert_eq!(err, LocationError::PermissionDenied);
    }

    #[tokio::test(start_paused = true)]
    async fn request_position_times_out() {
        let host = MockPositionHost::new();
        host.push_hang();

        let err = request_position(&host, &options(15_000)).await.unwrap_err();
        assert_eq!(err, LocationError::Timeout);
    }
}
