//! Position acquisition and continuous watching.
//!
//! - [`PositionAcquirer`]: single fixes with timeout fallback and refinement
//! - [`WatchController`]: foreground/background watches with subscriber fan-out
//! - [`PositionHost`]: the callback-style host API both are built on

pub mod acquirer;
pub mod error;
pub mod host;
pub mod watch;

pub use acquirer::PositionAcquirer;
pub use error::{LocationError, LocationResult};
pub use host::{
    default_source, request_position, HostCoords, HostPosition, HostPositionError,
    PositionCallback, PositionHost, PositionOptions, PositionUpdate, ProviderStatus,
    WatchCallback, WatchId, UNKNOWN_ACCURACY_M,
};
pub use watch::{LocationCallback, Subscription, WatchController, WatchKind};
