//! Public facade over the location subsystem.
//!
//! [`LocationService`] is the single entry point for consumers. It owns the
//! cache, the acquirer and the watch controller, and is torn down only
//! through [`LocationService::cleanup`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheStatistics, KeyValueStore, LocationCache};
use crate::config::{ConfigError, LocationConfig};
use crate::location::{AccuracyAssessment, AccuracyValidator, Coordinate, LatLng, ValidationResult};
use crate::permission::{PermissionGateway, PermissionResult, PermissionScope, PermissionStatus};
use crate::position::{
    LocationResult, PositionAcquirer, PositionHost, Subscription, WatchController,
};

/// A freshly acquired fix with its quality grade and plausibility check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedLocation {
    pub location: Coordinate,
    pub quality: AccuracyAssessment,
    pub validation: ValidationResult,
}

/// Freshness of the current location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Within the strict recency gate
    Fresh,
    /// Present but older than the strict gate
    Stale,
    Empty,
}

/// Snapshot of the service state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStatus {
    pub has_location: bool,
    pub permission: PermissionResult,
    /// Accuracy of the current location in meters
    pub accuracy: Option<f64>,
    pub cache_status: CacheStatus,
    pub is_watching: bool,
    pub is_background_watching: bool,
}

/// Whether a fix can currently be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAvailability {
    pub available: bool,
    pub permission: PermissionStatus,
    pub gps_enabled: bool,
    pub network_location_enabled: bool,
}

/// Outcome of a background permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundPermissionResult {
    pub background_location_granted: bool,
    pub status: PermissionStatus,
    pub can_ask_again: bool,
}

impl From<PermissionResult> for BackgroundPermissionResult {
    fn from(result: PermissionResult) -> Self {
        Self {
            background_location_granted: result.granted,
            status: result.status,
            can_ask_again: result.can_ask_again,
        }
    }
}

/// Device location service.
///
/// # Examples
///
/// ```rust,ignore
/// use locus_core::config::LocationConfig;
/// use locus_core::permission::PlatformPermissionGateway;
/// use locus_core::LocationService;
///
/// // `permissions` and `positions` are the app's host bridge implementations
/// let service = LocationService::new(
///     PlatformPermissionGateway::new(permissions),
///     positions,
///     LocationConfig::default(),
/// )?;
///
/// let _updates = service.subscribe_to_location_updates(|fix| {
///     println!("{}, {} ±{} m", fix.latitude, fix.longitude, fix.accuracy);
/// });
/// service.start_location_watch().await;
///
/// // On shutdown
/// service.cleanup();
/// ```
pub struct LocationService<G, H> {
    gateway: Arc<G>,
    host: Arc<H>,
    cache: Arc<LocationCache>,
    validator: AccuracyValidator,
    acquirer: PositionAcquirer<G, H>,
    watch: WatchController<G, H>,
}

impl<G, H> std::fmt::Debug for LocationService<G, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<G: PermissionGateway, H: PositionHost + 'static> LocationService<G, H> {
    /// Creates a service with a memory-only cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`LocationConfig::validate`].
    pub fn new(gateway: G, host: H, config: LocationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = LocationCache::new(config.cache.clone());
        Ok(Self::assemble(gateway, host, cache, config))
    }

    /// Creates a service whose cache is persisted to `store`.
    ///
    /// The configuration is checked before `store` is read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`LocationConfig::validate`].
    pub fn with_store(
        gateway: G,
        host: H,
        config: LocationConfig,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = LocationCache::with_store(config.cache.clone(), store);
        Ok(Self::assemble(gateway, host, cache, config))
    }

    fn assemble(gateway: G, host: H, cache: LocationCache, config: LocationConfig) -> Self {
        let gateway = Arc::new(gateway);
        let host = Arc::new(host);
        let cache = Arc::new(cache);
        let validator = AccuracyValidator::new(config.validation);

        Self {
            acquirer: PositionAcquirer::new(
                Arc::clone(&gateway),
                Arc::clone(&host),
                Arc::clone(&cache),
                config.acquisition,
            ),
            watch: WatchController::new(
                Arc::clone(&gateway),
                Arc::clone(&host),
                Arc::clone(&cache),
                validator.clone(),
                config.watch,
            ),
            gateway,
            host,
            cache,
            validator,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    #[must_use]
    pub const fn validator(&self) -> &AccuracyValidator {
        &self.validator
    }

    /// Acquires the current position. See [`PositionAcquirer::get_current_location`].
    ///
    /// # Errors
    ///
    /// Returns a [`crate::position::LocationError`] if no fix could be obtained.
    pub async fn get_current_location(
        &self,
        high_accuracy_first: bool,
    ) -> LocationResult<Coordinate> {
        self.acquirer.get_current_location(high_accuracy_first).await
    }

    /// Current location if it is at most `max_age` old.
    #[must_use]
    pub fn get_cached_location(&self, max_age: Duration) -> Option<Coordinate> {
        self.cache.get_cached(max_age)
    }

    /// Most reliable cached fix near `near`, using the lenient staleness ceiling.
    #[must_use]
    pub fn get_best_cached_location(&self, near: &LatLng) -> Option<CacheEntry> {
        self.cache.get_best_cached_location(near)
    }

    /// Acquires a fix, then grades it and checks it against the previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::position::LocationError`] if no fix could be
    /// obtained. An implausible fix is reported in `validation`, not as an
    /// error.
    pub async fn get_validated_current_location(&self) -> LocationResult<ValidatedLocation> {
        let previous = self.cache.current_location();
        let location = self.acquirer.get_current_location(false).await?;

        Ok(ValidatedLocation {
            location,
            quality: self.validator.assess_accuracy(&location),
            validation: self.validator.validate(&location, previous.as_ref()),
        })
    }

    pub async fn request_location_permission(&self) -> PermissionResult {
        self.gateway.request_foreground().await
    }

    pub async fn request_background_location_permission(&self) -> BackgroundPermissionResult {
        self.gateway.request_background().await.into()
    }

    pub async fn start_location_watch(&self) -> bool {
        self.watch.start_watch().await
    }

    pub fn stop_location_watch(&self) {
        self.watch.stop_watch();
    }

    pub async fn start_background_location_updates(&self) -> bool {
        self.watch.start_background_watch().await
    }

    pub fn stop_background_location_updates(&self) {
        self.watch.stop_background_watch();
    }

    pub fn subscribe_to_location_updates(
        &self,
        callback: impl Fn(&Coordinate) + Send + Sync + 'static,
    ) -> Subscription {
        self.watch.subscribe(callback)
    }

    pub fn subscribe_to_background_location_updates(
        &self,
        callback: impl Fn(&Coordinate) + Send + Sync + 'static,
    ) -> Subscription {
        self.watch.subscribe_background(callback)
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.is_watching()
    }

    #[must_use]
    pub fn is_background_watching(&self) -> bool {
        self.watch.is_background_watching()
    }

    #[must_use]
    pub const fn watch_controller(&self) -> &WatchController<G, H> {
        &self.watch
    }

    /// Reports the service state. Checks permission without prompting.
    pub async fn get_location_status(&self) -> LocationStatus {
        let permission = self.gateway.check(PermissionScope::Foreground).await;
        let current = self.cache.current_location();
        let cache_status = match current {
            None => CacheStatus::Empty,
            Some(_) if self.cache.get_cached(self.cache.config().fresh_max_age()).is_some() => {
                CacheStatus::Fresh
            }
            Some(_) => CacheStatus::Stale,
        };

        LocationStatus {
            has_location: current.is_some(),
            permission,
            accuracy: current.map(|c| c.accuracy),
            cache_status,
            is_watching: self.watch.is_watching(),
            is_background_watching: self.watch.is_background_watching(),
        }
    }

    /// Reports whether permission and at least one provider allow a fix.
    pub async fn is_location_available(&self) -> LocationAvailability {
        let permission = self.gateway.check(PermissionScope::Foreground).await;
        let providers = self.host.provider_status().await.unwrap_or_else(|e| {
            log::warn!("Provider status query failed: {e}");
            crate::position::ProviderStatus::default()
        });

        LocationAvailability {
            available: permission.granted && providers.any_enabled(),
            permission: permission.status,
            gps_enabled: providers.gps_enabled,
            network_location_enabled: providers.network_enabled,
        }
    }

    #[must_use]
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    pub fn clear_location_cache(&self) {
        self.cache.clear();
    }

    /// Stops both watches, drops every subscriber and empties the cache.
    ///
    /// Safe to call any number of times.
    pub fn cleanup(&self) {
        self.watch.cleanup();
        self.cache.clear();
        log::info!("Location service cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::AccuracyQuality;
    use crate::permission::{
        StatusPermissionGateway, STATUS_BACKGROUND_PERMISSION, STATUS_FOREGROUND_PERMISSION,
    };
    use crate::permission::HostPermissionStatus;
    use crate::position::{HostPositionError, ProviderStatus};
    use crate::testing::{host_fix, MockPositionHost, MockStatusPermissionHost};

    type Service =
        LocationService<StatusPermissionGateway<MockStatusPermissionHost>, MockPositionHost>;

    fn service(foreground: HostPermissionStatus) -> (Service, MockStatusPermissionHost) {
        let permissions = MockStatusPermissionHost::new();
        permissions.set(STATUS_FOREGROUND_PERMISSION, foreground);
        let service = LocationService::new(
            StatusPermissionGateway::new(permissions.clone()),
            MockPositionHost::new(),
            LocationConfig::default(),
        )
        .unwrap();
        (service, permissions)
    }

    #[test]
    fn new_rejects_inverted_freshness_tiers() {
        let mut config = LocationConfig::default();
        config.cache.stale_after_ms = config.cache.fresh_max_age_ms - 1;

        let result = LocationService::new(
            StatusPermissionGateway::new(MockStatusPermissionHost::new()),
            MockPositionHost::new(),
            config,
        );

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn with_store_rejects_zero_capacity() {
        let mut config = LocationConfig::default();
        config.cache.max_entries = 0;

        let result = LocationService::with_store(
            StatusPermissionGateway::new(MockStatusPermissionHost::new()),
            MockPositionHost::new(),
            config,
            Box::new(crate::cache::MemoryStore::new()),
        );

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn background_result_from_permission_result() {
        let result = BackgroundPermissionResult::from(PermissionResult::denied());
        assert!(!result.background_location_granted);
        assert_eq!(result.status, PermissionStatus::Denied);
        assert!(result.can_ask_again);
    }

    #[test]
    fn background_result_serializes_for_bridge() {
        let result = BackgroundPermissionResult::from(PermissionResult::blocked());
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"backgroundLocationGranted":false,"status":"blocked","canAskAgain":false}"#
        );
    }

    #[tokio::test]
    async fn validated_location_grades_fix() {
        let (service, _) = service(HostPermissionStatus::Granted);
        service.host.push_fix(host_fix(40.7128, -74.0060, 5.0));

        let validated = service.get_validated_current_location().await.unwrap();

        assert_eq!(validated.quality.quality, AccuracyQuality::Excellent);
        assert!(validated.validation.is_valid);
    }

    #[tokio::test]
    async fn validated_location_compares_with_previous_fix() {
        let (service, _) = service(HostPermissionStatus::Granted);
        service.host.push_fix(host_fix(40.7128, -74.0060, 5.0));
        service.host.push_fix(host_fix(35.6762, 139.6503, 5.0));

        service.get_current_location(false).await.unwrap();
        let validated = service.get_validated_current_location().await.unwrap();

        assert!(!validated.validation.is_valid);
    }

    #[tokio::test]
    async fn status_reports_without_prompting() {
        let (service, permissions) = service(HostPermissionStatus::Denied);

        let status = service.get_location_status().await;

        assert!(!status.has_location);
        assert_eq!(status.cache_status, CacheStatus::Empty);
        assert_eq!(status.permission.status, PermissionStatus::Denied);
        assert_eq!(permissions.request_count(), 0);
    }

    #[tokio::test]
    async fn status_reports_fresh_location() {
        let (service, _) = service(HostPermissionStatus::Granted);
        service.host.push_fix(host_fix(40.7128, -74.0060, 12.0));
        service.get_current_location(false).await.unwrap();

        let status = service.get_location_status().await;

        assert!(status.has_location);
        assert_eq!(status.accuracy, Some(12.0));
        assert_eq!(status.cache_status, CacheStatus::Fresh);
    }

    #[tokio::test]
    async fn availability_needs_permission_and_provider() {
        let (service, _) = service(HostPermissionStatus::Granted);
        assert!(service.is_location_available().await.available);

        service.host.set_provider_status(ProviderStatus {
            gps_enabled: false,
            network_enabled: false,
        });
        let availability = service.is_location_available().await;
        assert!(!availability.available);
        assert!(!availability.gps_enabled);
    }

    #[tokio::test]
    async fn availability_survives_provider_failure() {
        let (service, _) = service(HostPermissionStatus::Granted);
        service
            .host
            .fail_provider_status(HostPositionError::new(
                HostPositionError::INTERNAL_ERROR,
                "bridge",
            ));

        let availability = service.is_location_available().await;

        assert!(!availability.available);
        assert!(!availability.network_location_enabled);
        assert_eq!(availability.permission, PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn background_permission_blocked() {
        let (service, permissions) = service(HostPermissionStatus::Granted);
        permissions.set(STATUS_BACKGROUND_PERMISSION, HostPermissionStatus::Blocked);

        let result = service.request_background_location_permission().await;

        assert_eq!(
            result,
            BackgroundPermissionResult {
                background_location_granted: false,
                status: PermissionStatus::Blocked,
                can_ask_again: false,
            }
        );
    }

    #[test]
    fn debug_does_not_require_debug_hosts() {
        let (service, _) = service(HostPermissionStatus::Granted);
        assert!(format!("{service:?}").contains("LocationService"));
    }
}
