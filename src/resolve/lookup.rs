//! Client for the external batch lookup tool.

use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Shape of the lookup tool's stdout on success.
#[derive(Debug, Deserialize)]
struct LookupReply {
    #[serde(default)]
    txns: Option<Vec<String>>,
}

/// Invokes the external batch lookup tool for one digest at a time.
///
/// The tool is called as `<tool> --json <digest> <store>...` and is expected
/// to print a single JSON object with a `txns` list to stdout. Every failure
/// mode (spawn error, non-zero exit, timeout, empty or unparsable output,
/// missing `txns` field) is reported as `None` so the caller can treat it as
/// transient. The client itself never retries; a single call is equally
/// usable as a best-effort probe or as one attempt inside a retry loop.
pub struct LookupClient {
    tool_path: PathBuf,
    store_paths: Vec<PathBuf>,
    timeout: Duration,
}

impl LookupClient {
    /// Creates a new lookup client
    ///
    /// # Arguments
    /// * `tool_path` - Path to the lookup tool binary
    /// * `store_paths` - Data store locations passed through to the tool
    /// * `timeout` - Wall clock limit per invocation
    pub fn new(tool_path: PathBuf, store_paths: Vec<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool_path,
            store_paths,
            timeout,
        }
    }

    /// Fetch the transaction list for `digest`, or `None` if not found.
    pub async fn fetch(&self, digest: &str) -> Option<Vec<String>> {
        let mut command = Command::new(&self.tool_path);
        command
            .arg("--json")
            .arg(digest)
            .args(&self.store_paths)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An invocation that outlives the timeout is reaped, not leaked.
            .kill_on_drop(true);

        debug!("Running {} --json {}", self.tool_path.display(), digest);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                warn!("Failed to run lookup tool for {}: {}", digest, error);
                return None;
            }
            Err(_) => {
                warn!("Lookup tool timed out for {}", digest);
                return None;
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "Lookup tool exited non-zero ({:?}) for {}; stderr: {}",
                output.status.code(),
                digest,
                stderr.trim()
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return None;
        }

        match serde_json::from_str::<LookupReply>(stdout) {
            Ok(reply) => reply.txns,
            Err(error) => {
                let preview: String = stdout.chars().take(500).collect();
                warn!(
                    "Failed to parse lookup tool output for {}: {}; raw (truncated): {}",
                    digest, error, preview
                );
                None
            }
        }
    }
}
