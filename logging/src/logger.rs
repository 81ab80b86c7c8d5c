//! Structured Logger
//!
//! Wraps `tracing` with environment-based level control. Events go to
//! stderr: stdout is reserved for the encoded pipeline result.

use tracing_subscriber::EnvFilter;

/// Initialize the global structured logger.
///
/// `RUST_LOG` wins when set; `level` is the fallback directive. Calling
/// twice is harmless (the second init is ignored).
pub fn init_logger(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
