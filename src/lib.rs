//! # intel-gpu-top-exporter
//!
//! Runs `intel_gpu_top` in JSON streaming mode and republishes every sample
//! as Prometheus metrics.
//!
//! ## Architecture
//!
//! - **Sampler**: owns the `intel_gpu_top` child process on a worker thread,
//!   splits its output into JSON frames and decodes them into snapshots
//! - **Exporter**: consumes snapshots, updates gauges in an explicit
//!   registry and serves it over HTTP
//! - **Communication**: one unbuffered crossbeam channel between the two;
//!   nothing else is shared
//!
//! ## Example
//!
//! ```ignore
//! use intel_gpu_top_exporter::{
//!     config::ExporterConfig,
//!     exporter::{run_publisher, GpuMetrics, MetricsServer},
//!     sampler::SamplingPipeline,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ExporterConfig::from_env()?;
//!     let metrics = GpuMetrics::new()?;
//!
//!     let server = MetricsServer::bind(
//!         &config.listen_address,
//!         metrics.registry().clone(),
//!         config.metrics_path.clone(),
//!     )?;
//!     std::thread::spawn(move || server.run());
//!
//!     let sampler = SamplingPipeline::start(&config)?;
//!     let end = run_publisher(sampler.receiver(), &metrics);
//!     eprintln!("sampler stopped: {}", end);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod sampler;
pub mod types;

// Re-export commonly used types
pub use config::ExporterConfig;
pub use error::{ExporterError, Result};
pub use exporter::{run_publisher, GpuMetrics, MetricsServer, SnapshotSink};
pub use sampler::{
    decode_snapshot, DecodeError, FrameAssembler, SamplerMessage, SamplingPipeline, StreamEnd,
};
pub use types::MetricsSnapshot;
