//! Per-invocation plugin execution with a wall-clock budget.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use talon_core::{PluginMeta, PluginResult};

use crate::protocol;

/// Grace period a completed exchange grants the child to exit before the
/// reaper escalates to a kill.
const REAP_GRACE: Duration = Duration::from_secs(5);

/// Executes one plugin artifact against the three JSON sections.
///
/// A loader is created by the orchestrator for a single invocation and
/// discarded afterwards; the spawned process and its pipes are released on
/// every exit path.
pub struct PluginLoader {
    meta: PluginMeta,
    input: Value,
    settings: Value,
}

impl PluginLoader {
    pub fn new(meta: PluginMeta, input: Value, settings: Value) -> Self {
        Self {
            meta,
            input,
            settings,
        }
    }

    /// Invokes the artifact at `artifact`, waiting at most `timeout_ms`
    /// milliseconds. A non-positive timeout means wait indefinitely.
    ///
    /// On timeout the child is killed and the call returns immediately;
    /// the result never transitions back to completed even if the process
    /// finishes later.
    pub async fn execute(&self, artifact: &Path, timeout_ms: i64) -> PluginResult {
        let Some(entry) = self.meta.plugin_main_class.as_deref() else {
            return PluginResult::error("missing pluginMainClass in metadata");
        };

        let frame = match protocol::request_line(entry, &self.meta, &self.input, &self.settings) {
            Ok(frame) => frame,
            Err(e) => return PluginResult::Error(format!("plugin exception: {e}")),
        };

        let mut child = match Command::new(artifact)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return PluginResult::Error(format!("plugin exception: {e}")),
        };

        debug!(
            artifact = %artifact.display(),
            pid = child.id().unwrap_or(0),
            entry,
            "plugin process submitted"
        );

        // The pipes move into the exchange future; the child handle stays
        // here so the timeout arm can kill without waiting on the exchange.
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let exchange = exchange_frames(stdin, stdout, frame);

        let result = if timeout_ms > 0 {
            match tokio::time::timeout(Duration::from_millis(timeout_ms as u64), exchange).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        artifact = %artifact.display(),
                        timeout_ms,
                        "plugin exceeded its budget, killing process"
                    );
                    let _ = child.start_kill();
                    tokio::spawn(async move {
                        let _ = child.wait().await;
                    });
                    return PluginResult::Timeout;
                }
            }
        } else {
            exchange.await
        };

        reap(child);
        debug!(outcome = discriminant_name(&result), "plugin process completed");
        result
    }
}

/// Writes the request frame, closes stdin, and reads one response frame.
async fn exchange_frames(
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    frame: String,
) -> PluginResult {
    let (Some(mut stdin), Some(stdout)) = (stdin, stdout) else {
        return PluginResult::error("plugin exception: plugin stdio unavailable");
    };

    let write = async {
        stdin.write_all(frame.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await
    };
    if let Err(e) = write.await {
        return PluginResult::Error(format!("plugin exception: {e}"));
    }
    // Close the pipe so plugins that read to EOF are not left waiting.
    drop(stdin);

    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) => PluginResult::error("plugin exception: plugin exited without a response frame"),
        Ok(_) => protocol::classify_response(line.trim()),
        Err(e) => PluginResult::Error(format!("plugin exception: {e}")),
    }
}

/// Collects the child without blocking the pipeline. A child that lingers
/// past the grace period is killed.
fn reap(mut child: Child) {
    tokio::spawn(async move {
        if tokio::time::timeout(REAP_GRACE, child.wait()).await.is_err() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    });
}

fn discriminant_name(result: &PluginResult) -> &'static str {
    match result {
        PluginResult::Ok(_) => "ok",
        PluginResult::Error(_) => "error",
        PluginResult::Timeout => "timeout",
    }
}
