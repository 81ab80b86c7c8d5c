//! Structured logging setup and redaction for the Talon runtime.
//!
//! The pipeline result travels on stdout, so everything here writes to
//! stderr; the returned result is never derived from log output.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_secrets;
