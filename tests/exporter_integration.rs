//! End-to-end tests for the exporter
//!
//! A fake tool feeds the pipeline, the publisher updates the registry and
//! the HTTP server is scraped over a real socket.

#![cfg(unix)]

mod common;

use common::{cat_body, fake_tool};
use intel_gpu_top_exporter::config::{
    ExporterConfig, ENV_BINARY, ENV_INTERVAL_MS, ENV_LISTEN_ADDRESS, ENV_METRICS_PATH,
};
use intel_gpu_top_exporter::exporter::{run_publisher, GpuMetrics, MetricsServer};
use intel_gpu_top_exporter::sampler::{SamplingPipeline, StreamEnd};
use serial_test::serial;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::time::Duration;

const OUTPUT: &str = "{
\t\"period\": {
\t\t\"duration\": 1033.398519,
\t\t\"unit\": \"ms\"
\t},
\t\"power\": {
\t\t\"GPU\": 1.182905,
\t\t\"Package\": 24.891973,
\t\t\"unit\": \"W\"
\t},
\t\"engines\": {
\t\t\"Render/3D/0\": {
\t\t\t\"busy\": 13.620188,
\t\t\t\"sema\": 0.000000,
\t\t\t\"wait\": 0.000000,
\t\t\t\"unit\": \"%\"
\t\t}
\t}
}
{
\t\"period\":
}";

fn scrape(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    write!(
        stream,
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    )
    .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

#[test]
#[serial]
fn test_scrape_after_sampler_ends() {
    let tool = fake_tool(&cat_body(OUTPUT));

    let mut config = ExporterConfig::default();
    config.binary = tool.path.clone();
    config.listen_address = "127.0.0.1:0".to_string();
    config.sample_interval = Duration::from_millis(100);

    let metrics = GpuMetrics::new().unwrap();
    let server = MetricsServer::bind(
        &config.listen_address,
        metrics.registry().clone(),
        config.metrics_path.clone(),
    )
    .unwrap();
    let addr = server.local_addr().unwrap();
    std::thread::spawn(move || server.run());

    let sampler = SamplingPipeline::start(&config).unwrap();
    let end = run_publisher(sampler.receiver(), &metrics);
    sampler.join();

    assert_eq!(end, StreamEnd::Closed { exit_code: Some(0) });
    assert_eq!(metrics.error_count(), 1);

    // Last known values stay available after the sampler is gone.
    let body = scrape(addr, "/metrics");
    assert!(body.starts_with("HTTP/1.1 200"));
    assert!(body.contains("intel_gpu_top_period{unit=\"ms\"} 1033.398519"));
    assert!(body.contains("intel_gpu_top_power_package{unit=\"W\"} 24.891973"));
    assert!(body.contains("intel_gpu_top_engines_render3d_busy{unit=\"%\"} 13.620188"));
    assert!(body.contains("intel_gpu_top_errors 1"));
    assert!(body.contains("intel_gpu_top_sampler_up 0"));
}

#[test]
#[serial]
fn test_config_from_process_environment() {
    std::env::set_var(ENV_BINARY, "/tmp/fake_intel_gpu_top");
    std::env::set_var(ENV_INTERVAL_MS, "750");
    std::env::set_var(ENV_LISTEN_ADDRESS, "127.0.0.1:9999");
    std::env::set_var(ENV_METRICS_PATH, "/gpu-metrics");

    let config = ExporterConfig::from_env();

    std::env::remove_var(ENV_BINARY);
    std::env::remove_var(ENV_INTERVAL_MS);
    std::env::remove_var(ENV_LISTEN_ADDRESS);
    std::env::remove_var(ENV_METRICS_PATH);

    let config = config.unwrap();
    assert_eq!(config.binary, PathBuf::from("/tmp/fake_intel_gpu_top"));
    assert_eq!(config.interval_millis(), 750);
    assert_eq!(config.listen_address, "127.0.0.1:9999");
    assert_eq!(config.metrics_path, "/gpu-metrics");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_config_defaults_without_environment() {
    std::env::remove_var(ENV_BINARY);
    std::env::remove_var(ENV_INTERVAL_MS);

    let config = ExporterConfig::from_env().unwrap();
    assert_eq!(config.binary, PathBuf::from("/usr/bin/intel_gpu_top"));
    assert_eq!(config.interval_millis(), 5000);
}
