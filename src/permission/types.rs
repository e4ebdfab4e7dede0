//! Normalized permission types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which location permission is being negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionScope {
    /// While the app is in use
    Foreground,
    /// At all times, including when backgrounded
    Background,
}

/// Normalized permission state shared by all platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    /// Refused, but the user can still be prompted
    Denied,
    /// Refused terminally; only the system settings can change it
    Blocked,
    /// No location capability, or the platform query failed
    Unavailable,
}

impl PermissionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Blocked => "blocked",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Outcome of a permission check or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResult {
    pub granted: bool,
    pub status: PermissionStatus,
    /// True only for a non-terminal denial
    pub can_ask_again: bool,
}

impl PermissionResult {
    /// Builds the result for a status, deriving `granted` and `can_ask_again`.
    #[must_use]
    pub const fn from_status(status: PermissionStatus) -> Self {
        Self {
            granted: matches!(status, PermissionStatus::Granted),
            status,
            can_ask_again: matches!(status, PermissionStatus::Denied),
        }
    }

    #[must_use]
    pub const fn granted() -> Self {
        Self::from_status(PermissionStatus::Granted)
    }

    #[must_use]
    pub const fn denied() -> Self {
        Self::from_status(PermissionStatus::Denied)
    }

    #[must_use]
    pub const fn blocked() -> Self {
        Self::from_status(PermissionStatus::Blocked)
    }

    /// Result reported when the host query itself failed.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self::from_status(PermissionStatus::Unavailable)
    }

    /// True if prompting again cannot change the outcome.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            PermissionStatus::Blocked | PermissionStatus::Unavailable
        )
    }
}

/// Permission state as reported by hosts that expose rich statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPermissionStatus {
    Granted,
    Denied,
    Blocked,
    /// Parental controls or device policy
    Restricted,
    Unavailable,
}

impl From<HostPermissionStatus> for PermissionStatus {
    fn from(status: HostPermissionStatus) -> Self {
        match status {
            HostPermissionStatus::Granted => Self::Granted,
            HostPermissionStatus::Denied => Self::Denied,
            HostPermissionStatus::Blocked | HostPermissionStatus::Restricted => Self::Blocked,
            HostPermissionStatus::Unavailable => Self::Unavailable,
        }
    }
}

/// A permission query failed inside the host layer.
#[derive(Debug, Clone, Error)]
#[error("Host permission query failed: {0}")]
pub struct HostPermissionError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_ask_again_only_for_denied() {
        assert!(!PermissionResult::granted().can_ask_again);
        assert!(PermissionResult::denied().can_ask_again);
        assert!(!PermissionResult::blocked().can_ask_again);
        assert!(!PermissionResult::unavailable().can_ask_again);
    }

    #[test]
    fn granted_flag_follows_status() {
        assert!(PermissionResult::granted().granted);
        assert!(!PermissionResult::denied().granted);
        assert!(!PermissionResult::blocked().granted);
    }

    #[test]
    fn restricted_normalizes_to_blocked() {
        assert_eq!(
            PermissionStatus::from(HostPermissionStatus::Restricted),
            PermissionStatus::Blocked
        );
    }

    #[test]
    fn terminal_states() {
        assert!(PermissionResult::blocked().is_terminal());
        assert!(PermissionResult::unavailable().is_terminal());
        assert!(!PermissionResult::denied().is_terminal());
    }

    #[test]
    fn serializes_for_bridge() {
        let json = serde_json::to_string(&PermissionResult::blocked()).unwrap();
        assert_eq!(
            json,
            r#"{"granted":false,"status":"blocked","canAskAgain":false}"#
        );
    }

    #[test]
    fn host_error_display() {
        let err = HostPermissionError("bridge not ready".to_string());
        assert_eq!(err.to_string(), "Host permission query failed: bridge not ready");
    }
}
