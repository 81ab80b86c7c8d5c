//! Log Redaction Layer
//!
//! Scrubs secret-bearing assignments from strings prior to logging. Plugin
//! error messages can echo back environment fragments; they pass through
//! here before reaching an event.

use regex::Regex;
use std::sync::LazyLock;

static SECRET_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(SECRET_KEY|PLUGIN_SIG_[A-Z0-9_]+)\s*=\s*\S+").unwrap()
});

/// Redacts secret assignments in a string.
pub fn redact_secrets(input: &str) -> String {
    SECRET_ASSIGNMENT_RE
        .replace_all(input, "$1=[REDACTED]")
        .to_string()
}
