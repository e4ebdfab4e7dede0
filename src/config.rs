//! Tunable configuration for the location subsystem.
//!
//! Every threshold the subsystem uses lives here so the embedding app can
//! load them from JSON. Missing fields fall back to the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its allowed range.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub acquisition: AcquisitionConfig,
    pub validation: ValidationConfig,
    pub cache: CacheConfig,
    pub watch: WatchConfig,
}

impl LocationConfig {
    /// Parses and checks a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this configuration to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (extremely rare).
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.validation;
        if !(v.excellent_max_m <= v.good_max_m
            && v.good_max_m <= v.fair_max_m
            && v.fair_max_m <= v.max_usable_accuracy_m)
        {
            return Err(ConfigError::InvalidValue(
                "accuracy thresholds must be non-decreasing".to_string(),
            ));
        }
        if v.max_speed_kmh <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "max_speed_kmh must be positive".to_string(),
            ));
        }

        let a = &self.acquisition;
        if a.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if a.relaxed_timeout_ms < a.high_accuracy_timeout_ms {
            return Err(ConfigError::InvalidValue(
                "relaxed_timeout_ms must not be shorter than high_accuracy_timeout_ms".to_string(),
            ));
        }

        let c = &self.cache;
        if c.max_entries == 0 {
            return Err(ConfigError::InvalidValue(
                "max_entries must be at least 1".to_string(),
            ));
        }
        if c.stale_after_ms < c.fresh_max_age_ms {
            return Err(ConfigError::InvalidValue(
                "stale_after_ms must be looser than fresh_max_age_ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// Single-shot acquisition tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Timeout of the first, high-accuracy request
    pub high_accuracy_timeout_ms: u64,
    /// Timeout of the relaxed retry after a timeout
    pub relaxed_timeout_ms: u64,
    /// Oldest platform-cached fix the high-accuracy request may return
    pub high_accuracy_maximum_age_ms: u64,
    /// Oldest platform-cached fix the relaxed request may return
    pub relaxed_maximum_age_ms: u64,
    /// Accuracy radius above which `high_accuracy_first` keeps refining
    pub coarse_threshold_m: u32,
    /// Total attempts allowed when refining
    pub max_attempts: u32,
}

impl AcquisitionConfig {
    #[must_use]
    pub const fn high_accuracy_timeout(&self) -> Duration {
        Duration::from_millis(self.high_accuracy_timeout_ms)
    }

    #[must_use]
    pub const fn relaxed_timeout(&self) -> Duration {
        Duration::from_millis(self.relaxed_timeout_ms)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            high_accuracy_timeout_ms: 15_000,
            relaxed_timeout_ms: 30_000,
            high_accuracy_maximum_age_ms: 10_000,
            relaxed_maximum_age_ms: 60_000,
            coarse_threshold_m: 1000,
            max_attempts: 3,
        }
    }
}

/// Accuracy tiers and plausibility ceilings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub excellent_max_m: f64,
    pub good_max_m: f64,
    pub fair_max_m: f64,
    /// Fixes coarser than this are unusable
    pub max_usable_accuracy_m: f64,
    /// Implied speeds above this are flagged as teleportation
    pub max_speed_kmh: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            excellent_max_m: 10.0,
            good_max_m: 50.0,
            fair_max_m: 100.0,
            max_usable_accuracy_m: 5000.0,
            max_speed_kmh: 1000.0,
        }
    }
}

/// Cache sizing and the two freshness tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of buckets kept
    pub max_entries: usize,
    /// Strict freshness window used by the facade's cached lookup
    pub fresh_max_age_ms: u64,
    /// Lenient staleness ceiling for best-cached lookups
    pub stale_after_ms: u64,
    /// Neighbourhood radius scanned by best-cached lookups
    pub nearby_radius_km: f64,
}

impl CacheConfig {
    #[must_use]
    pub const fn fresh_max_age(&self) -> Duration {
        Duration::from_millis(self.fresh_max_age_ms)
    }

    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            fresh_max_age_ms: 60_000,
            stale_after_ms: 30 * 60 * 1000,
            nearby_radius_km: 1.0,
        }
    }
}

/// Accuracy mode requested from the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyMode {
    High,
    Balanced,
    Low,
}

/// Continuous update parameters for one watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    pub accuracy: AccuracyMode,
    /// Minimum movement in meters between updates
    pub distance_filter_m: u32,
    /// Preferred update interval
    pub interval_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: AccuracyMode::High,
            distance_filter_m: 10,
            interval_ms: 5_000,
        }
    }
}

/// Foreground and background watch parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub foreground: WatchOptions,
    pub background: WatchOptions,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            foreground: WatchOptions::default(),
            background: WatchOptions {
                accuracy: AccuracyMode::Balanced,
                distance_filter_m: 50,
                interval_ms: 60_000,
            },
        }
    }
}
