//! Permission gateways that normalize platform permission primitives.
//!
//! Two host shapes exist: a binary grant/deny primitive and a rich status
//! primitive. Both are adapted to [`PermissionGateway`], which never fails:
//! host errors are reported as [`PermissionStatus::Unavailable`].

use std::future::Future;

use super::types::{
    HostPermissionError, HostPermissionStatus, PermissionResult, PermissionScope,
    PermissionStatus,
};

/// Binary-host permission id for foreground location.
pub const BINARY_FOREGROUND_PERMISSION: &str = "android.permission.ACCESS_FINE_LOCATION";

/// Binary-host permission id for background location.
pub const BINARY_BACKGROUND_PERMISSION: &str = "android.permission.ACCESS_BACKGROUND_LOCATION";

/// Status-host permission id for foreground location.
pub const STATUS_FOREGROUND_PERMISSION: &str = "ios.permission.LOCATION_WHEN_IN_USE";

/// Status-host permission id for background location.
pub const STATUS_BACKGROUND_PERMISSION: &str = "ios.permission.LOCATION_ALWAYS";

/// Unified permission negotiation.
pub trait PermissionGateway: Send + Sync {
    /// Reports the current state without prompting the user.
    fn check(&self, scope: PermissionScope) -> impl Future<Output = PermissionResult> + Send;

    /// Prompts the user if needed and reports the resulting state.
    fn request(&self, scope: PermissionScope) -> impl Future<Output = PermissionResult> + Send;

    fn request_foreground(&self) -> impl Future<Output = PermissionResult> + Send {
        self.request(PermissionScope::Foreground)
    }

    /// Requests background access. May run a second prompt cycle after the
    /// foreground one.
    fn request_background(&self) -> impl Future<Output = PermissionResult> + Send {
        self.request(PermissionScope::Background)
    }
}

/// Host permission API exposing only granted / not granted.
pub trait BinaryPermissionHost: Send + Sync {
    fn check(
        &self,
        permission: &'static str,
    ) -> impl Future<Output = Result<bool, HostPermissionError>> + Send;

    fn request(
        &self,
        permission: &'static str,
    ) -> impl Future<Output = Result<bool, HostPermissionError>> + Send;
}

/// Host permission API exposing granted/denied/blocked/restricted states.
pub trait StatusPermissionHost: Send + Sync {
    fn check(
        &self,
        permission: &'static str,
    ) -> impl Future<Output = Result<HostPermissionStatus, HostPermissionError>> + Send;

    fn request(
        &self,
        permission: &'static str,
    ) -> impl Future<Output = Result<HostPermissionStatus, HostPermissionError>> + Send;
}

/// Gateway selected for the build target.
#[cfg(target_os = "ios")]
pub type PlatformPermissionGateway<H> = StatusPermissionGateway<H>;

/// Gateway selected for the build target.
#[cfg(not(target_os = "ios"))]
pub type PlatformPermissionGateway<H> = BinaryPermissionGateway<H>;

fn unavailable(permission: &str, err: &HostPermissionError) -> PermissionResult {
    log::warn!("Permission query for {permission} failed: {err}");
    PermissionResult::unavailable()
}

/// Gateway over a [`BinaryPermissionHost`].
///
/// A refusal is never terminal on this host shape, so denials always allow
/// asking again.
#[derive(Debug, Clone)]
pub struct BinaryPermissionGateway<H> {
    host: H,
}

impl<H: BinaryPermissionHost> BinaryPermissionGateway<H> {
    pub const fn new(host: H) -> Self {
        Self { host }
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    const fn permission_id(scope: PermissionScope) -> &'static str {
        match scope {
            PermissionScope::Foreground => BINARY_FOREGROUND_PERMISSION,
            PermissionScope::Background => BINARY_BACKGROUND_PERMISSION,
        }
    }

    const fn normalize(granted: bool) -> PermissionResult {
        if granted {
            PermissionResult::granted()
        } else {
            PermissionResult::denied()
        }
    }

    async fn check_id(&self, permission: &'static str) -> PermissionResult {
        match self.host.check(permission).await {
            Ok(granted) => Self::normalize(granted),
            Err(e) => unavailable(permission, &e),
        }
    }

    async fn request_id(&self, permission: &'static str) -> PermissionResult {
        let current = self.check_id(permission).await;
        if current.granted || current.is_terminal() {
            return current;
        }
        match self.host.request(permission).await {
            Ok(granted) => Self::normalize(granted),
            Err(e) => unavailable(permission, &e),
        }
    }
}

impl<H: BinaryPermissionHost> PermissionGateway for BinaryPermissionGateway<H> {
    async fn check(&self, scope: PermissionScope) -> PermissionResult {
        self.check_id(Self::permission_id(scope)).await
    }

    async fn request(&self, scope: PermissionScope) -> PermissionResult {
        match scope {
            PermissionScope::Foreground => self.request_id(BINARY_FOREGROUND_PERMISSION).await,
            PermissionScope::Background => {
                let background = self.check_id(BINARY_BACKGROUND_PERMISSION).await;
                if background.granted || background.is_terminal() {
                    return background;
                }
                let foreground = self.request_id(BINARY_FOREGROUND_PERMISSION).await;
                if !foreground.granted {
                    return foreground;
                }
                self.request_id(BINARY_BACKGROUND_PERMISSION).await
            }
        }
    }
}

/// Gateway over a [`StatusPermissionHost`].
#[derive(Debug, Clone)]
pub struct StatusPermissionGateway<H> {
    host: H,
}

impl<H: StatusPermissionHost> StatusPermissionGateway<H> {
    pub const fn new(host: H) -> Self {
        Self { host }
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    const fn permission_id(scope: PermissionScope) -> &'static str {
        match scope {
            PermissionScope::Foreground => STATUS_FOREGROUND_PERMISSION,
            PermissionScope::Background => STATUS_BACKGROUND_PERMISSION,
        }
    }

    fn normalize(status: HostPermissionStatus) -> PermissionResult {
        PermissionResult::from_status(PermissionStatus::from(status))
    }

    async fn check_id(&self, permission: &'static str) -> PermissionResult {
        match self.host.check(permission).await {
            Ok(status) => Self::normalize(status),
            Err(e) => unavailable(permission, &e),
        }
    }

    async fn request_id(&self, permission: &'static str) -> PermissionResult {
        let current = self.check_id(permission).await;
        if current.granted || current.is_terminal() {
            return current;
        }
        match self.host.request(permission).await {
            Ok(status) => Self::normalize(status),
            Err(e) => unavailable(permission, &e),
        }
    }
}

impl<H: StatusPermissionHost> PermissionGateway for StatusPermissionGateway<H> {
    async fn check(&self, scope: PermissionScope) -> PermissionResult {
        self.check_id(Self::permission_id(scope)).await
    }

    async fn request(&self, scope: PermissionScope) -> PermissionResult {
        match scope {
            PermissionScope::Foreground => self.request_id(STATUS_FOREGROUND_PERMISSION).await,
            PermissionScope::Background => {
                let background = self.check_id(STATUS_BACKGROUND_PERMISSION).await;
                if background.granted || background.is_terminal() {
                    return background;
                }
                let foreground = self.request_id(STATUS_FOREGROUND_PERMISSION).await;
                if !foreground.granted {
                    return foreground;
                }
                self.request_id(STATUS_BACKGROUND_PERMISSION).await
            }
        }
    }
}
