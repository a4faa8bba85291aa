//! Publishing snapshots as Prometheus metrics
//!
//! [`GpuMetrics`] owns a private [`prometheus::Registry`] with one gauge
//! family per snapshot field, each labelled with the unit the tool reported.
//! [`run_publisher`] is the consumer loop: it drains the sampler channel and
//! feeds a [`SnapshotSink`] until the sampler ends. [`MetricsServer`] serves
//! the registry over HTTP.
//!
//! The server never depends on the sampler: after the sampler stops, scrapes
//! keep returning the last published values.

pub mod http;

pub use http::MetricsServer;

use crate::error::Result;
use crate::sampler::{SamplerMessage, StreamEnd};
use crate::types::{EngineSlot, MetricsSnapshot};
use crossbeam_channel::Receiver;
use prometheus::{Gauge, GaugeVec, IntCounter, Opts, Registry};

/// Prefix of every exported metric
pub const METRIC_PREFIX: &str = "intel_gpu_top";

/// Label carrying the unit of a value
pub const UNIT_LABEL: &str = "unit";

/// Receives what the sampler produces
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotSink {
    /// Note that a sampler is running and about to deliver
    fn sampler_started(&self);

    /// Record a freshly decoded snapshot
    fn publish(&self, snapshot: &MetricsSnapshot);

    /// Count a frame that could not be decoded
    fn record_decode_failure(&self);

    /// Note that the sampler has stopped
    fn sampler_stopped(&self, end: &StreamEnd);
}

/// Gauges for the three values of one engine slot
#[derive(Clone)]
struct EngineGauges {
    busy: GaugeVec,
    sema: GaugeVec,
    wait: GaugeVec,
}

/// The exporter's metrics, registered in their own registry
#[derive(Clone)]
pub struct GpuMetrics {
    registry: Registry,
    period: GaugeVec,
    frequency_requested: GaugeVec,
    frequency_actual: GaugeVec,
    interrupts: GaugeVec,
    rc6: GaugeVec,
    power_gpu: GaugeVec,
    power_package: GaugeVec,
    imc_bandwidth_reads: GaugeVec,
    imc_bandwidth_writes: GaugeVec,
    engines: [EngineGauges; 4],
    updated_at: Gauge,
    errors: IntCounter,
    sampler_up: Gauge,
}

impl GpuMetrics {
    /// Create and register every metric in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let period = unit_gauge(&registry, "period", "Length of the sampling period")?;
        let frequency_requested =
            unit_gauge(&registry, "frequency_requested", "Requested GPU frequency")?;
        let frequency_actual = unit_gauge(&registry, "frequency_actual", "Actual GPU frequency")?;
        let interrupts = unit_gauge(&registry, "interrupts", "GPU interrupt rate")?;
        let rc6 = unit_gauge(&registry, "rc6", "RC6 residency")?;
        let power_gpu = unit_gauge(&registry, "power_gpu", "GPU power draw")?;
        let power_package = unit_gauge(&registry, "power_package", "Package power draw")?;
        let imc_bandwidth_reads =
            unit_gauge(&registry, "imc_bandwidth_reads", "Memory controller read bandwidth")?;
        let imc_bandwidth_writes =
            unit_gauge(&registry, "imc_bandwidth_writes", "Memory controller write bandwidth")?;

        let engine = |slot: EngineSlot| -> Result<EngineGauges> {
            let name = slot.metric_name();
            Ok(EngineGauges {
                busy: unit_gauge(
                    &registry,
                    &format!("engines_{}_busy", name),
                    &format!("Busy time of engine {}", slot.json_key()),
                )?,
                sema: unit_gauge(
                    &registry,
                    &format!("engines_{}_sema", name),
                    &format!("Semaphore wait time of engine {}", slot.json_key()),
                )?,
                wait: unit_gauge(
                    &registry,
                    &format!("engines_{}_wait", name),
                    &format!("Wait time of engine {}", slot.json_key()),
                )?,
            })
        };
        let engines = [
            engine(EngineSlot::Render3D)?,
            engine(EngineSlot::Blitter)?,
            engine(EngineSlot::Video)?,
            engine(EngineSlot::VideoEnhance)?,
        ];

        let updated_at = Gauge::with_opts(Opts::new(
            format!("{}_updated_at", METRIC_PREFIX),
            "Unix time of the last published sample",
        ))?;
        registry.register(Box::new(updated_at.clone()))?;

        let errors = IntCounter::with_opts(Opts::new(
            format!("{}_errors", METRIC_PREFIX),
            "Samples that could not be decoded",
        ))?;
        registry.register(Box::new(errors.clone()))?;

        let sampler_up = Gauge::with_opts(Opts::new(
            format!("{}_sampler_up", METRIC_PREFIX),
            "Whether the sampling tool is still producing output",
        ))?;
        registry.register(Box::new(sampler_up.clone()))?;

        Ok(Self {
            registry,
            period,
            frequency_requested,
            frequency_actual,
            interrupts,
            rc6,
            power_gpu,
            power_package,
            imc_bandwidth_reads,
            imc_bandwidth_writes,
            engines,
            updated_at,
            errors,
            sampler_up,
        })
    }

    /// Registry holding all metrics, for serving
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of frames that failed to decode so far
    pub fn error_count(&self) -> u64 {
        self.errors.get()
    }

    fn engine_gauges(&self, slot: EngineSlot) -> &EngineGauges {
        let index = match slot {
            EngineSlot::Render3D => 0,
            EngineSlot::Blitter => 1,
            EngineSlot::Video => 2,
            EngineSlot::VideoEnhance => 3,
        };
        &self.engines[index]
    }
}

impl SnapshotSink for GpuMetrics {
    fn sampler_started(&self) {
        self.sampler_up.set(1.0);
    }

    fn publish(&self, m: &MetricsSnapshot) {
        set(&self.period, &m.period.unit, m.period.duration);

        set(&self.frequency_requested, &m.frequency.unit, m.frequency.requested);
        set(&self.frequency_actual, &m.frequency.unit, m.frequency.actual);

        set(&self.interrupts, &m.interrupts.unit, m.interrupts.count);

        set(&self.rc6, &m.rc6.unit, m.rc6.value);

        set(&self.power_gpu, &m.power.unit, m.power.gpu);
        set(&self.power_package, &m.power.unit, m.power.package);

        set(&self.imc_bandwidth_reads, &m.imc_bandwidth.unit, m.imc_bandwidth.reads);
        set(&self.imc_bandwidth_writes, &m.imc_bandwidth.unit, m.imc_bandwidth.writes);

        for (slot, usage) in m.engines.iter() {
            let gauges = self.engine_gauges(slot);
            set(&gauges.busy, &usage.unit, usage.busy);
            set(&gauges.sema, &usage.unit, usage.sema);
            set(&gauges.wait, &usage.unit, usage.wait);
        }

        let now = chrono::Utc::now();
        self.updated_at.set(now.timestamp_millis() as f64 / 1000.0);
    }

    fn record_decode_failure(&self) {
        self.errors.inc();
    }

    fn sampler_stopped(&self, _end: &StreamEnd) {
        self.sampler_up.set(0.0);
    }
}

fn unit_gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(
        Opts::new(format!("{}_{}", METRIC_PREFIX, name), help),
        &[UNIT_LABEL],
    )?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn set(gauge: &GaugeVec, unit: &str, value: f64) {
    gauge.with_label_values(&[unit]).set(value);
}

/// Consume sampler messages until the sampler ends
///
/// Returns why the sampler stopped. A channel that closes without an
/// [`SamplerMessage::Ended`] (the worker died) is reported as
/// [`StreamEnd::Failed`].
pub fn run_publisher<S>(receiver: &Receiver<SamplerMessage>, sink: &S) -> StreamEnd
where
    S: SnapshotSink + ?Sized,
{
    sink.sampler_started();
    tracing::info!("waiting for metrics");

    let end = loop {
        match receiver.recv() {
            Ok(SamplerMessage::Snapshot(snapshot)) => {
                tracing::info!("received metrics, publishing");
                sink.publish(&snapshot);
            }
            Ok(SamplerMessage::DecodeFailure(e)) => {
                tracing::debug!(error = %e, "counting undecodable frame");
                sink.record_decode_failure();
            }
            Ok(SamplerMessage::Ended(end)) => break end,
            Err(_) => {
                break StreamEnd::Failed {
                    reason: "sampler channel closed unexpectedly".to_string(),
                }
            }
        }
    };

    sink.sampler_stopped(&end);
    end
}
