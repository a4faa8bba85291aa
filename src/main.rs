//! intel_gpu_top Prometheus exporter - Main Entry Point
//!
//! Samples `intel_gpu_top -J` and serves the values on `/metrics`.

use anyhow::Context;
use intel_gpu_top_exporter::{
    config::ExporterConfig,
    exporter::{run_publisher, GpuMetrics, MetricsServer},
    sampler::SamplingPipeline,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,intel_gpu_top_exporter=debug")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let _guard = init_logging();

    tracing::info!("Starting intel_gpu_top exporter");

    let config = ExporterConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let metrics = GpuMetrics::new().context("failed to register metrics")?;

    let server = MetricsServer::bind(
        &config.listen_address,
        metrics.registry().clone(),
        config.metrics_path.clone(),
    )
    .context("failed to run http server")?;

    let sampler = SamplingPipeline::start(&config).context("failed to start sampling")?;

    let server_handle = std::thread::Builder::new()
        .name("metrics-http".to_string())
        .spawn(move || server.run())
        .context("failed to spawn http server thread")?;

    let end = run_publisher(sampler.receiver(), &metrics);
    tracing::error!(%end, "sampling stopped, serving last known values");
    sampler.join();

    if server_handle.join().is_err() {
        anyhow::bail!("http server thread panicked");
    }

    Ok(())
}
