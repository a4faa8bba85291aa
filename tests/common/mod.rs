//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use crossbeam_channel::Receiver;
use intel_gpu_top_exporter::sampler::SamplerMessage;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// How long to wait for a message from a fake tool
pub fn test_timeout() -> Duration {
    Duration::from_secs(10)
}

/// A shell script standing in for `intel_gpu_top`
pub struct FakeTool {
    _dir: TempDir,
    pub path: PathBuf,
}

/// Write an executable `/bin/sh` script with the given body
///
/// The script receives the same arguments the real tool would
/// (`-J -s <interval_ms>`).
#[cfg(unix)]
pub fn fake_tool(body: &str) -> FakeTool {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("intel_gpu_top");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write fake tool");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make fake tool executable");

    FakeTool { _dir: dir, path }
}

/// Script body printing `text` verbatim
pub fn cat_body(text: &str) -> String {
    format!("cat <<'FRAMES'\n{}\nFRAMES", text)
}

/// Receive until `Ended`, failing the test if the sampler goes quiet
pub fn collect_until_end(receiver: &Receiver<SamplerMessage>) -> Vec<SamplerMessage> {
    let mut messages = Vec::new();
    loop {
        let msg = receiver
            .recv_timeout(test_timeout())
            .expect("sampler should keep sending until it ends");
        let ended = matches!(msg, SamplerMessage::Ended(_));
        messages.push(msg);
        if ended {
            return messages;
        }
    }
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
