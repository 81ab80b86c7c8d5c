//! Base64 helpers used to serialize binary payloads into transport-safe
//! strings. Output is a single continuous line, padding kept.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;

use talon_core::{EngineError, Result};

/// Encodes bytes with the standard RFC 4648 §4 alphabet (`+`, `/`, `=`).
pub fn encode_standard(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes bytes with the URL-safe RFC 4648 §5 alphabet (`-`, `_`, `=`).
pub fn encode_urlsafe(data: &[u8]) -> String {
    URL_SAFE.encode(data)
}

/// Decodes a standard-alphabet Base64 string.
pub fn decode_standard(data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data)
        .map_err(|e| EngineError::Codec(e.to_string()))
}
