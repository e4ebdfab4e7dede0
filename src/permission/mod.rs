//! Location permission negotiation.
//!
//! Host platforms disagree on how permissions are reported. One side only
//! answers granted / not granted; the other distinguishes denied, blocked
//! and restricted. Both are normalized here to [`PermissionResult`].
//!
//! # Normalization
//!
//! | Host answer | `status` | `can_ask_again` |
//! |-------------|----------|-----------------|
//! | granted / `true` | granted | false |
//! | denied / `false` | denied | true |
//! | blocked, restricted | blocked | false |
//! | unavailable, query error | unavailable | false |
//!
//! The implementation is chosen at build time through
//! [`PlatformPermissionGateway`].

mod gateway;
mod types;

pub use gateway::{
    BinaryPermissionGateway, BinaryPermissionHost, PermissionGateway, PlatformPermissionGateway,
    StatusPermissionGateway, StatusPermissionHost, BINARY_BACKGROUND_PERMISSION,
    BINARY_FOREGROUND_PERMISSION, STATUS_BACKGROUND_PERMISSION, STATUS_FOREGROUND_PERMISSION,
};
pub use types::{
    HostPermissionError, HostPermissionStatus, PermissionResult, PermissionScope,
    PermissionStatus,
};
