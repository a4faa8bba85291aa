//! Core data types for the exporter
//!
//! This module contains the snapshot produced once per sampling interval by
//! `intel_gpu_top -J`. Every group and every field inside a group is
//! optional in the input: a missing number decodes as `0.0` and a missing
//! unit as an empty string. An explicit `null` counts as missing. Unknown
//! fields are ignored.
//!
//! # Main Types
//!
//! - [`MetricsSnapshot`] - One decoded sample
//! - [`Engines`] / [`EngineUsage`] - The four fixed engine slots
//! - [`EngineSlot`] - Names an engine slot and its key in the tool's output
//!
//! The serialized shape matches the tool's JSON, so a snapshot encoded with
//! `serde_json` decodes back to an identical value.

use serde::{Deserialize, Deserializer, Serialize};

/// Free-form per-client data. Only reported when the tool runs on the host
/// (not inside a container) and never interpreted here, whatever its shape.
pub type Clients = serde_json::Value;

/// Decode `null` the same way as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One decoded sample of GPU metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    /// Length of the sampling period
    #[serde(deserialize_with = "null_as_default")]
    pub period: Period,
    /// Requested and actual GPU frequency
    #[serde(deserialize_with = "null_as_default")]
    pub frequency: Frequency,
    /// Interrupt rate
    #[serde(deserialize_with = "null_as_default")]
    pub interrupts: Interrupts,
    /// RC6 residency
    #[serde(deserialize_with = "null_as_default")]
    pub rc6: Rc6,
    /// GPU and package power draw
    #[serde(deserialize_with = "null_as_default")]
    pub power: Power,
    /// Memory controller bandwidth
    #[serde(rename = "imc-bandwidth", deserialize_with = "null_as_default")]
    pub imc_bandwidth: ImcBandwidth,
    /// Per-engine utilisation
    #[serde(deserialize_with = "null_as_default")]
    pub engines: Engines,
    /// Per-client data, absent when the tool cannot see clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Clients>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Period {
    #[serde(deserialize_with = "null_as_default")]
    pub duration: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frequency {
    #[serde(deserialize_with = "null_as_default")]
    pub requested: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub actual: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interrupts {
    #[serde(deserialize_with = "null_as_default")]
    pub count: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rc6 {
    #[serde(deserialize_with = "null_as_default")]
    pub value: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Power {
    #[serde(rename = "GPU", deserialize_with = "null_as_default")]
    pub gpu: f64,
    #[serde(rename = "Package", deserialize_with = "null_as_default")]
    pub package: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImcBandwidth {
    #[serde(deserialize_with = "null_as_default")]
    pub reads: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub writes: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

/// Busy, semaphore and wait percentages for one engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineUsage {
    #[serde(deserialize_with = "null_as_default")]
    pub busy: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub sema: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub wait: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
}

/// The four engine slots the exporter tracks
///
/// The tool keys engines by class and instance (`"Render/3D/0"`). Only
/// instance 0 of each class is read; other keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Engines {
    #[serde(rename = "Render/3D/0", deserialize_with = "null_as_default")]
    pub render_3d: EngineUsage,
    #[serde(rename = "Blitter/0", deserialize_with = "null_as_default")]
    pub blitter: EngineUsage,
    #[serde(rename = "Video/0", deserialize_with = "null_as_default")]
    pub video: EngineUsage,
    #[serde(rename = "VideoEnhance/0", deserialize_with = "null_as_default")]
    pub video_enhance: EngineUsage,
}

/// Identifies one of the fixed engine slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineSlot {
    Render3D,
    Blitter,
    Video,
    VideoEnhance,
}

impl EngineSlot {
    /// All slots in output order
    pub const ALL: [EngineSlot; 4] = [
        EngineSlot::Render3D,
        EngineSlot::Blitter,
        EngineSlot::Video,
        EngineSlot::VideoEnhance,
    ];

    /// Key used for this slot in the tool's JSON output
    pub fn json_key(&self) -> &'static str {
        match self {
            EngineSlot::Render3D => "Render/3D/0",
            EngineSlot::Blitter => "Blitter/0",
            EngineSlot::Video => "Video/0",
            EngineSlot::VideoEnhance => "VideoEnhance/0",
        }
    }

    /// Fragment used in exported metric names
    pub fn metric_name(&self) -> &'static str {
        match self {
            EngineSlot::Render3D => "render3d",
            EngineSlot::Blitter => "blitter",
            EngineSlot::Video => "video",
            EngineSlot::VideoEnhance => "video_enhance",
        }
    }
}

impl Engines {
    /// Get the usage recorded for a slot
    pub fn get(&self, slot: EngineSlot) -> &EngineUsage {
        match slot {
            EngineSlot::Render3D => &self.render_3d,
            EngineSlot::Blitter => &self.blitter,
            EngineSlot::Video => &self.video,
            EngineSlot::VideoEnhance => &self.video_enhance,
        }
    }

    /// Iterate over all slots with their usage
    pub fn iter(&self) -> impl Iterator<Item = (EngineSlot, &EngineUsage)> {
        EngineSlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}
