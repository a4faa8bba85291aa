//! Launching the sampling tool
//!
//! The tool is started as `<binary> -J -s <interval_ms>`: `-J` selects the
//! streaming JSON output and `-s` the sampling period. Stdout is piped to
//! the worker, stderr is left attached to ours.

use crate::config::{interval_millis, ExporterConfig};
use crate::error::{ExporterError, Result};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

/// How to invoke the sampling tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerCommand {
    /// Path of the tool
    pub binary: PathBuf,
    /// Sampling interval
    pub interval: Duration,
}

/// A running tool with its stdout detached from the [`Child`]
pub struct SamplerProcess {
    pub child: Child,
    pub stdout: ChildStdout,
}

impl SamplerCommand {
    pub fn new(binary: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            binary: binary.into(),
            interval,
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(config.binary.clone(), config.sample_interval)
    }

    /// Arguments passed to the tool
    pub fn args(&self) -> Vec<String> {
        vec![
            "-J".to_string(),
            "-s".to_string(),
            interval_millis(self.interval).to_string(),
        ]
    }

    /// Start the tool
    ///
    /// Fails with [`ExporterError::Startup`] when the process cannot be
    /// created and [`ExporterError::StdoutUnavailable`] when its output
    /// cannot be attached.
    pub fn spawn(&self) -> Result<SamplerProcess> {
        let args = self.args();
        tracing::info!(binary = %self.binary.display(), ?args, "starting the sampling tool");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExporterError::Startup {
                binary: self.binary.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            // Reap the process we cannot read from.
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExporterError::StdoutUnavailable {
                binary: self.binary.clone(),
            });
        };

        tracing::debug!(pid = child.id(), "sampling tool started");
        Ok(SamplerProcess { child, stdout })
    }
}
