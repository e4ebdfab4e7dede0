//! Error types for position acquisition.

use thiserror::Error;

use super::host::HostPositionError;

/// Errors that can occur while acquiring a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Foreground location permission is not granted.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The platform could not produce a fix.
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    /// No fix arrived before the deadline.
    #[error("Location request timed out")]
    Timeout,
}

impl LocationError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location permission is required. Please enable it in your device settings."
            }
            Self::Unavailable(_) => {
                "Unable to determine your location. Check that location services are turned on."
            }
            Self::Timeout => "Finding your location took too long. Please try again.",
        }
    }

    /// True only for errors that a relaxed-accuracy retry can recover from.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<HostPositionError> for LocationError {
    fn from(err: HostPositionError) -> Self {
        match err.code {
            HostPositionError::PERMISSION_DENIED => Self::PermissionDenied,
            HostPositionError::TIMEOUT => Self::Timeout,
            _ => Self::Unavailable(err.message),
        }
    }
}

/// Result type for position operations.
pub type LocationResult<T> = Result<T, LocationError>;
