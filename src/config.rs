//! Configuration Module
//!
//! This module defines the settings for the extraction pipeline.
//! Settings are loaded from a TOML file and parsed using serde; every
//! section is optional and falls back to built-in defaults, and command
//! line flags take precedence over both.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [retry]
/// interval_secs = 2.0
/// max_retries = 120
///
/// [snapshot]
/// every = 1
///
/// [lookup]
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub snapshot: SnapshotConfig,
    pub lookup: LookupConfig,
}

/// Retry behavior for batches the lookup tool cannot find yet.
///
/// # Fields
/// - `interval_secs`: constant delay between attempts, in seconds
/// - `max_retries`: attempts per missing batch; -1 retries indefinitely
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub interval_secs: f64,
    pub max_retries: i64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            max_retries: 120,
        }
    }
}

/// Snapshot cadence for the output file.
///
/// # Fields
/// - `every`: flush the output after this many newly committed records.
///   Higher values trade I/O for a larger loss window on abrupt termination.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub every: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { every: 1 }
    }
}

/// External lookup tool invocation settings.
///
/// # Fields
/// - `timeout_secs`: per-invocation wall clock limit for the tool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        // Read the file contents as a string
        let content = fs::read_to_string(path)?;

        // Parse the TOML into our Config structure
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Retry interval as a `Duration`.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs_f64(self.retry.interval_secs)
    }

    /// Lookup timeout as a `Duration`.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtins() {
        let config = Config::default();
        assert_eq!(config.retry.interval_secs, 2.0);
        assert_eq!(config.retry.max_retries, 120);
        assert_eq!(config.snapshot.every, 1);
        assert_eq!(config.lookup.timeout_secs, 60);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[retry]\nmax_retries = -1\n").unwrap();
        assert_eq!(config.retry.max_retries, -1);
        assert_eq!(config.retry.interval_secs, 2.0);
        assert_eq!(config.snapshot.every, 1);
    }
}
