//! HMAC-SHA256 computation and constant-time verification.
//!
//! Artifact signatures are raw HMAC-SHA256 output over the artifact bytes,
//! stored Base64-encoded in the environment.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use talon_core::{EngineError, Result};

use crate::codec;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output size in bytes.
pub const MAC_LEN: usize = 32;

/// Computes raw HMAC-SHA256 over `data`.
pub fn mac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut m = HmacSha256::new_from_slice(key)
        .map_err(|e| EngineError::Crypto(format!("HMAC init failed: {e}")))?;
    m.update(data);
    Ok(m.finalize().into_bytes().to_vec())
}

/// Computes HMAC-SHA256 and returns it in the stored-signature form:
/// standard Base64 with padding.
pub fn mac_base64(key: &[u8], data: &[u8]) -> Result<String> {
    Ok(codec::encode_standard(&mac(key, data)?))
}

/// Recomputes the MAC and compares against `expected` in constant time.
///
/// Returns `false` (never an error) on length mismatch or any internal
/// failure; the comparison does not short-circuit on the first differing
/// byte.
pub fn verify(key: &[u8], data: &[u8], expected: &[u8]) -> bool {
    match mac(key, data) {
        Ok(actual) => constant_time_eq(&actual, expected),
        Err(_) => false,
    }
}

#[inline]
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
