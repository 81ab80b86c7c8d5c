//! The Talon execution pipeline.
//!
//! One invocation in, one encoded string out: resolve and verify the
//! artifact, optionally decrypt the input, run the plugin under a wall-clock
//! budget, optionally encrypt the output, and Base64-encode the result.
//! Pipeline failures are reported through the returned string, never raised.

pub mod orchestrator;

pub use orchestrator::{signature_key, Orchestrator, DEFAULT_TIMEOUT_MS};

use talon_core::InvocationRequest;

/// Embedded entry point: runs the pipeline on three JSON strings.
///
/// Semantics are identical to the CLI's 3-argument mode. Only malformed JSON
/// produces an error; every pipeline-level failure comes back as the result
/// string.
pub async fn run_from_json(meta: &str, input: &str, settings: &str) -> anyhow::Result<String> {
    let request = InvocationRequest::from_json_parts(meta, input, settings)?;
    Ok(Orchestrator::new(request).process().await)
}
