//! Error handling for the exporter
//!
//! This module defines the crate-wide error type and a Result alias. Per-frame
//! decode failures have their own type
//! ([`DecodeError`](crate::sampler::DecodeError)) because they are recoverable
//! and travel over the sampler channel, while everything in [`ExporterError`]
//! stops whatever produced it. The end of the tool's output is not an error
//! here; it arrives as [`StreamEnd`](crate::sampler::StreamEnd).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for exporter operations
#[derive(Error, Debug)]
pub enum ExporterError {
    /// The sampling tool could not be launched
    #[error("cannot start {}: {source}", binary.display())]
    Startup {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sampling tool started but its stdout could not be attached
    #[error("cannot attach to the output of {}", binary.display())]
    StdoutUnavailable { binary: PathBuf },

    /// Errors related to metric registration or encoding
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Errors related to the scrape endpoint
    #[error("HTTP error: {0}")]
    Http(String),

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;
