//! Sampling pipeline around `intel_gpu_top`
//!
//! This module owns the sampling tool for its whole life and turns its
//! output into a stream of typed messages for a single consumer.
//!
//! # Architecture
//!
//! ```text
//! intel_gpu_top -J -s N ──stdout──▶ FrameAssembler ──frame──▶ decode_snapshot
//!                                                               │
//!                      consumer ◀──── rendezvous channel ◀──────┘
//! ```
//!
//! - [`FrameAssembler`] - Splits the line stream into `{` .. `}` frames
//! - [`decode_snapshot`] - Parses a frame into a [`MetricsSnapshot`]
//! - [`SamplerCommand`] - Builds and spawns the tool's command line
//! - [`SamplerWorker`] - The read-decode-send loop on its own thread
//! - [`SamplingPipeline`] - Entry point tying the above together
//!
//! # Failure model
//!
//! - Launch failures are returned from [`SamplingPipeline::start`] and never
//!   reach the channel.
//! - A frame that fails to decode becomes [`SamplerMessage::DecodeFailure`]
//!   and sampling continues.
//! - When the output closes or cannot be read, a single
//!   [`SamplerMessage::Ended`] is sent and the worker exits. Restarting is
//!   left to the caller.
//!
//! # Example
//!
//! ```ignore
//! use intel_gpu_top_exporter::config::ExporterConfig;
//! use intel_gpu_top_exporter::sampler::{SamplerMessage, SamplingPipeline};
//!
//! let sampler = SamplingPipeline::start(&ExporterConfig::default())?;
//! for msg in sampler.receiver().iter() {
//!     match msg {
//!         SamplerMessage::Snapshot(snapshot) => println!("{:?}", snapshot.rc6),
//!         SamplerMessage::DecodeFailure(e) => eprintln!("bad frame: {}", e),
//!         SamplerMessage::Ended(end) => break,
//!     }
//! }
//! ```

pub mod decoder;
pub mod frame;
pub mod process;
pub mod worker;

pub use decoder::{decode_snapshot, DecodeError, DecodeErrorKind};
pub use frame::{collapse_tabs, FrameAssembler, FrameBuffer};
pub use process::{SamplerCommand, SamplerProcess};
pub use worker::{forward_frames, ForwardOutcome, SamplerWorker, REAP_GRACE};

use crate::config::ExporterConfig;
use crate::error::{ExporterError, Result};
use crate::types::MetricsSnapshot;
use crossbeam_channel::{bounded, Receiver};
use std::thread::JoinHandle;

/// Name given to the worker thread
pub const WORKER_THREAD_NAME: &str = "intel-gpu-top-sampler";

/// Message sent from the sampler to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum SamplerMessage {
    /// A frame decoded into a snapshot
    Snapshot(MetricsSnapshot),
    /// A frame was dropped because it could not be decoded
    DecodeFailure(DecodeError),
    /// The sampler has stopped; nothing follows
    Ended(StreamEnd),
}

/// Why the sampler stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The tool closed its output, normally by exiting
    Closed {
        /// Exit code, when the tool exited rather than being killed by a signal
        exit_code: Option<i32>,
    },
    /// Reading the output failed
    Failed { reason: String },
}

impl std::fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnd::Closed {
                exit_code: Some(code),
            } => write!(f, "output closed, tool exited with code {}", code),
            StreamEnd::Closed { exit_code: None } => {
                write!(f, "output closed, tool terminated by a signal")
            }
            StreamEnd::Failed { reason } => write!(f, "output could not be read: {}", reason),
        }
    }
}

/// Starts the sampling tool and its worker thread
pub struct SamplingPipeline;

impl SamplingPipeline {
    /// Start sampling with the tool and interval from `config`
    pub fn start(config: &ExporterConfig) -> Result<SamplerReceiver> {
        Self::start_with(&SamplerCommand::from_config(config))
    }

    /// Start sampling with an explicit command
    pub fn start_with(command: &SamplerCommand) -> Result<SamplerReceiver> {
        let process = command.spawn()?;

        // Capacity 0: every message is handed over directly to the consumer.
        let (message_tx, message_rx) = bounded(0);
        let worker = SamplerWorker::new(process, message_tx);

        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(|source| ExporterError::Startup {
                binary: command.binary.clone(),
                source,
            })?;

        Ok(SamplerReceiver {
            receiver: message_rx,
            handle,
        })
    }
}

/// Consumer side of a running sampler
pub struct SamplerReceiver {
    receiver: Receiver<SamplerMessage>,
    handle: JoinHandle<()>,
}

impl SamplerReceiver {
    /// The underlying channel
    pub fn receiver(&self) -> &Receiver<SamplerMessage> {
        &self.receiver
    }

    /// Drop the channel and wait for the worker to finish
    ///
    /// Dropping the receiver makes the worker kill the tool at its next send.
    pub fn join(self) {
        let Self { receiver, handle } = self;
        drop(receiver);
        if handle.join().is_err() {
            tracing::error!("sampler worker panicked");
        }
    }
}
