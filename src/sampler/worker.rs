//! Sampler worker thread
//!
//! Reads the tool's stdout line by line, assembles frames, decodes them and
//! hands each result to the consumer over the sampler channel. The channel
//! is a rendezvous channel, so a slow consumer stalls decoding, which stalls
//! reading, which eventually stalls the tool on a full pipe.
//!
//! Exactly one [`SamplerMessage::Ended`] is sent, as the last message, unless
//! the consumer has already gone away. It goes out as soon as the output
//! closes: a tool still running [`REAP_GRACE`] after closing its stdout is
//! killed and reported without an exit code.

use crate::sampler::frame::{collapse_tabs, FrameAssembler};
use crate::sampler::process::SamplerProcess;
use crate::sampler::{decode_snapshot, SamplerMessage, StreamEnd};
use crossbeam_channel::Sender;
use std::io::{self, BufRead, BufReader};
use std::process::Child;
use std::time::{Duration, Instant};

/// How long the tool gets to exit after closing its output
pub const REAP_GRACE: Duration = Duration::from_secs(2);

const REAP_POLL: Duration = Duration::from_millis(10);

/// How forwarding frames stopped
#[derive(Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The line source ran out
    Exhausted,
    /// Reading a line failed
    Failed(String),
    /// The consumer dropped its receiver
    Disconnected,
}

/// The worker that owns the sampling tool for its whole life
pub struct SamplerWorker {
    process: SamplerProcess,
    message_tx: Sender<SamplerMessage>,
}

impl SamplerWorker {
    pub fn new(process: SamplerProcess, message_tx: Sender<SamplerMessage>) -> Self {
        Self {
            process,
            message_tx,
        }
    }

    /// Run until the tool's output ends or the consumer disconnects
    pub fn run(self) {
        let Self {
            process: SamplerProcess { mut child, stdout },
            message_tx,
        } = self;

        tracing::info!("waiting for the output with metrics");
        let lines = BufReader::new(stdout).lines();
        let outcome = forward_frames(lines, &message_tx);

        let end = match outcome {
            ForwardOutcome::Exhausted => StreamEnd::Closed {
                exit_code: reap(&mut child, REAP_GRACE),
            },
            ForwardOutcome::Failed(reason) => {
                tracing::error!(error = %reason, "couldn't read the sampling tool's output");
                let _ = child.kill();
                let _ = child.wait();
                StreamEnd::Failed { reason }
            }
            ForwardOutcome::Disconnected => {
                tracing::info!("consumer gone, stopping the sampling tool");
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
        };

        tracing::warn!(%end, "sampler stopped");
        let _ = message_tx.send(SamplerMessage::Ended(end));
    }
}

/// Exit code of `child` once it exits, killing it if it outlives `grace`
///
/// `None` when the tool was killed, by us or by a signal.
fn reap(child: &mut Child, grace: Duration) -> Option<i32> {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) if Instant::now() < deadline => std::thread::sleep(REAP_POLL),
            Ok(None) => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "sampling tool closed its output but kept running, killing it"
                );
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "couldn't reap the sampling tool");
                break;
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
    None
}

/// Assemble, decode and send every frame from `lines`
///
/// Decode failures are reported on the channel and never stop the loop.
pub fn forward_frames<L>(lines: L, message_tx: &Sender<SamplerMessage>) -> ForwardOutcome
where
    L: Iterator<Item = io::Result<String>>,
{
    for frame in FrameAssembler::new(lines) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => return ForwardOutcome::Failed(e.to_string()),
        };

        tracing::debug!(metrics = %collapse_tabs(&frame), "processing metrics");

        let message = match decode_snapshot(&frame) {
            Ok(snapshot) => SamplerMessage::Snapshot(snapshot),
            Err(e) => {
                tracing::error!(error = %e, "couldn't load metrics from json");
                SamplerMessage::DecodeFailure(e)
            }
        };

        if message_tx.send(message).is_err() {
            return ForwardOutcome::Disconnected;
        }
    }

    ForwardOutcome::Exhausted
}
