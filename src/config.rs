//! Configuration Module
//!
//! Handles building cache configuration, either in code or from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries the cache can hold
    pub capacity: usize,
    /// TTL applied to entries inserted without an explicit TTL
    pub default_ttl: Option<Duration>,
    /// Snapshot file location, None disables persistence and autosave
    pub persist_path: Option<PathBuf>,
    /// Interval between automatic snapshots, zero disables autosave
    pub autosave_interval: Duration,
}

impl CacheConfig {
    /// Creates a config with the given capacity and defaults for everything else.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum live entries (default: 128)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, fractional allowed (default: none)
    /// - `CACHE_PERSIST_PATH` - Snapshot file path (default: none)
    /// - `CACHE_AUTOSAVE_INTERVAL` - Autosave interval in seconds, `<= 0` disables (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            default_ttl: env_seconds("CACHE_DEFAULT_TTL")
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .or(defaults.default_ttl),
            persist_path: env::var("CACHE_PERSIST_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or(defaults.persist_path),
            autosave_interval: env_seconds("CACHE_AUTOSAVE_INTERVAL")
                .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
                .unwrap_or(defaults.autosave_interval),
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    /// Sets the autosave interval. `Duration::ZERO` turns autosave off.
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// True when both a snapshot path and a non-zero interval are configured.
    pub fn autosave_enabled(&self) -> bool {
        self.persist_path.is_some() && !self.autosave_interval.is_zero()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            default_ttl: None,
            persist_path: None,
            autosave_interval: Duration::from_secs(5),
        }
    }
}

fn env_seconds(name: &str) -> Option<f64> {
    env::var(name).ok().and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 128);
        assert!(config.default_ttl.is_none());
        assert!(config.persist_path.is_none());
        assert_eq!(config.autosave_interval, Duration::from_secs(5));
        assert!(!config.autosave_enabled());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new(10)
            .with_default_ttl(Duration::from_secs(2))
            .with_persist_path("cache.json")
            .with_autosave_interval(Duration::from_millis(500));

        assert_eq!(config.capacity, 10);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(2)));
        assert_eq!(config.persist_path, Some(PathBuf::from("cache.json")));
        assert!(config.autosave_enabled());
    }

    #[test]
    fn test_zero_interval_disables_autosave() {
        let config = CacheConfig::new(10)
            .with_persist_path("cache.json")
            .with_autosave_interval(Duration::ZERO);
        assert!(!config.autosave_enabled());
    }

    // All env manipulation lives in one test so parallel tests never race on the variables.
    #[test]
    fn test_config_from_env() {
        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_PERSIST_PATH");
        env::remove_var("CACHE_AUTOSAVE_INTERVAL");

        let config = CacheConfig::from_env();
        assert_eq!(config.capacity, 128);
        assert!(config.default_ttl.is_none());
        assert!(config.persist_path.is_none());
        assert_eq!(config.autosave_interval, Duration::from_secs(5));

        env::set_var("CACHE_CAPACITY", "3");
        env::set_var("CACHE_DEFAULT_TTL", "1.5");
        env::set_var("CACHE_PERSIST_PATH", "snap.json");
        env::set_var("CACHE_AUTOSAVE_INTERVAL", "-1");

        let config = CacheConfig::from_env();
        assert_eq!(config.capacity, 3);
        assert_eq!(config.default_ttl, Some(Duration::from_millis(1500)));
        assert_eq!(config.persist_path, Some(PathBuf::from("snap.json")));
        assert_eq!(config.autosave_interval, Duration::ZERO);
        assert!(!config.autosave_enabled());

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_PERSIST_PATH");
        env::remove_var("CACHE_AUTOSAVE_INTERVAL");
    }
}
