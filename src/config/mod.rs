//! Configuration module for the exporter
//!
//! There is no configuration file. Every setting has a default and can be
//! overridden through the environment:
//!
//! | Variable                        | Setting            | Default                   |
//! |---------------------------------|--------------------|---------------------------|
//! | `INTEL_GPU_TOP_BINARY`          | sampling tool path | `/usr/bin/intel_gpu_top`  |
//! | `INTEL_GPU_TOP_INTERVAL_MS`     | sampling interval  | `5000`                    |
//! | `INTEL_GPU_TOP_LISTEN_ADDRESS`  | scrape address     | `0.0.0.0:9000`            |
//! | `INTEL_GPU_TOP_METRICS_PATH`    | scrape path        | `/metrics`                |
//!
//! # Example
//!
//! ```ignore
//! use intel_gpu_top_exporter::config::ExporterConfig;
//!
//! let config = ExporterConfig::from_env()?;
//! config.validate()?;
//! ```

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the sampling tool
pub const DEFAULT_BINARY: &str = "/usr/bin/intel_gpu_top";

/// Default sampling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 5000;

/// Default scrape listen address
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9000";

/// Default scrape path
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

pub const ENV_BINARY: &str = "INTEL_GPU_TOP_BINARY";
pub const ENV_INTERVAL_MS: &str = "INTEL_GPU_TOP_INTERVAL_MS";
pub const ENV_LISTEN_ADDRESS: &str = "INTEL_GPU_TOP_LISTEN_ADDRESS";
pub const ENV_METRICS_PATH: &str = "INTEL_GPU_TOP_METRICS_PATH";

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Path of the `intel_gpu_top` binary
    pub binary: PathBuf,

    /// Time between samples, passed to the tool in whole milliseconds
    pub sample_interval: Duration,

    /// Address the scrape endpoint binds to
    pub listen_address: String,

    /// Path the registry is served on
    pub metrics_path: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            sample_interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl ExporterConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(binary) = lookup(ENV_BINARY) {
            config.binary = PathBuf::from(binary);
        }

        if let Some(raw) = lookup(ENV_INTERVAL_MS) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                ExporterError::Config(format!(
                    "{} must be whole milliseconds ({:?}): {}",
                    ENV_INTERVAL_MS, raw, e
                ))
            })?;
            config.sample_interval = Duration::from_millis(ms);
        }

        if let Some(address) = lookup(ENV_LISTEN_ADDRESS) {
            config.listen_address = address;
        }

        if let Some(path) = lookup(ENV_METRICS_PATH) {
            config.metrics_path = path;
        }

        Ok(config)
    }

    /// Reject settings the exporter cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(ExporterError::Config("sampling tool path is empty".to_string()));
        }
        if self.sample_interval.is_zero() {
            return Err(ExporterError::Config("sampling interval must be positive".to_string()));
        }
        if self.listen_address.trim().is_empty() {
            return Err(ExporterError::Config("listen address is empty".to_string()));
        }
        if !self.metrics_path.starts_with('/') {
            return Err(ExporterError::Config(format!(
                "metrics path must start with '/': {:?}",
                self.metrics_path
            )));
        }
        Ok(())
    }

    /// Sampling interval as passed to the tool
    pub fn interval_millis(&self) -> u64 {
        interval_millis(self.sample_interval)
    }
}

/// Whole milliseconds in `interval`, truncated, never below 1
pub fn interval_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1)
}
