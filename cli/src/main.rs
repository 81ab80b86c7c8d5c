//! `talon` — runs one plugin invocation and prints the encoded result.
//!
//! Two modes, selected by argument count:
//! - 0 arguments: one JSON object on stdin with `meta`, `input`, and
//!   `settings` keys.
//! - 3 arguments: the three section JSONs, in order.
//!
//! The result — or the pipeline failure string — goes to stdout with a
//! trailing newline and exit code 0. Failure is signalled by content, not
//! exit code; only unusable arguments or malformed JSON exit nonzero.

use anyhow::{bail, Context, Result};
use tokio::io::AsyncReadExt;

use talon_core::InvocationRequest;
use talon_engine::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    talon_logging::init_logger("info");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = match args.len() {
        0 => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read stdin")?;
            let piped = serde_json::from_str(&raw).context("stdin is not valid JSON")?;
            InvocationRequest::from_value(piped)?
        }
        3 => InvocationRequest::from_json_parts(&args[0], &args[1], &args[2])?,
        n => bail!("expected 0 or 3 arguments, got {n}"),
    };

    let result = Orchestrator::new(request).process().await;
    println!("{result}");
    Ok(())
}
