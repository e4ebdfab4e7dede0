//! Tiered-accuracy position acquisition.
//!
//! A request starts at high accuracy. A timeout triggers exactly one
//! relaxed-accuracy retry with a longer deadline; permission and
//! availability failures are returned as-is. Callers that insist on a
//! precise fix can ask for refinement, which repeats high-accuracy requests
//! while the fix stays coarser than the configured threshold.

use std::sync::Arc;
use std::time::Duration;

use super::error::{LocationError, LocationResult};
use super::host::{request_position, PositionHost, PositionOptions};
use crate::cache::LocationCache;
use crate::config::{AccuracyMode, AcquisitionConfig};
use crate::location::{Coordinate, FixSource};
use crate::permission::PermissionGateway;

/// Accuracy tier of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    High,
    Relaxed,
}

#[derive(Debug, Clone, Copy)]
struct Fix {
    coordinate: Coordinate,
    source: FixSource,
}

/// Acquires single fixes and records them in the cache.
pub struct PositionAcquirer<G, H> {
    gateway: Arc<G>,
    host: Arc<H>,
    cache: Arc<LocationCache>,
    config: AcquisitionConfig,
}

impl<G: PermissionGateway, H: PositionHost> PositionAcquirer<G, H> {
    pub const fn new(
        gateway: Arc<G>,
        host: Arc<H>,
        cache: Arc<LocationCache>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            gateway,
            host,
            cache,
            config,
        }
    }

    pub const fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Acquires the current position.
    ///
    /// With `high_accuracy_first`, a fix coarser than the coarse threshold is
    /// refined by further high-accuracy requests, up to the configured total
    /// number of attempts. The most accurate fix obtained is returned.
    ///
    /// # Errors
    ///
    /// - [`LocationError::PermissionDenied`] if foreground permission is not
    ///   granted or the host reports it revoked
    /// - [`LocationError::Unavailable`] if the platform cannot produce a fix
    /// - [`LocationError::Timeout`] if the relaxed retry also timed out
    pub async fn get_current_location(
        &self,
        high_accuracy_first: bool,
    ) -> LocationResult<Coordinate> {
        let permission = self.gateway.request_foreground().await;
        if !permission.granted {
            log::debug!("Acquisition refused: permission {}", permission.status.as_str());
            return Err(LocationError::PermissionDenied);
        }

        let mut best = match self.attempt(Tier::High).await {
            Ok(fix) => fix,
            Err(e) if e.is_retryable() => {
                log::debug!("High-accuracy request timed out, retrying with relaxed accuracy");
                let fix = self.attempt(Tier::Relaxed).await?;
                return Ok(self.record(fix));
            }
            Err(e) => return Err(e),
        };

        if high_accuracy_first {
            let threshold = f64::from(self.config.coarse_threshold_m);
            let mut attempts = 1;
            while best.coordinate.accuracy > threshold && attempts < self.config.max_attempts {
                attempts += 1;
                log::debug!(
                    "Fix accuracy {:.0} m above {threshold:.0} m, refinement attempt {attempts}",
                    best.coordinate.accuracy
                );
                match self.attempt(Tier::High).await {
                    Ok(fix) if fix.coordinate.accuracy < best.coordinate.accuracy => best = fix,
                    Ok(_) => {}
                    Err(e) => {
                        log::debug!("Refinement attempt failed, keeping best fix: {e}");
                        break;
                    }
                }
            }
        }

        Ok(self.record(best))
    }

    fn options(&self, tier: Tier) -> PositionOptions {
        match tier {
            Tier::High => PositionOptions {
                accuracy: AccuracyMode::High,
                timeout: self.config.high_accuracy_timeout(),
                maximum_age: Duration::from_millis(self.config.high_accuracy_maximum_age_ms),
            },
            Tier::Relaxed => PositionOptions {
                accuracy: AccuracyMode::Low,
                timeout: self.config.relaxed_timeout(),
                maximum_age: Duration::from_millis(self.config.relaxed_maximum_age_ms),
            },
        }
    }

    async fn attempt(&self, tier: Tier) -> LocationResult<Fix> {
        let options = self.options(tier);
        let position = request_position(self.host.as_ref(), &options).await?;
        Ok(Fix {
            coordinate: position.to_coordinate()?,
            source: position.source_or(options.accuracy),
        })
    }

    fn record(&self, fix: Fix) -> Coordinate {
        self.cache.store_last_known(fix.coordinate, fix.source);
        fix.coordinate
    }
}
