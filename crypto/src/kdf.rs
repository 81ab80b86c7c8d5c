//! Passphrase key derivation: a single SHA-256 over the UTF-8 bytes.
//!
//! Deliberately not hardened (no salt, no stretching) so that signatures
//! cross-validate bit-for-bit with sibling implementations. Do not swap in
//! PBKDF2/HKDF/Argon2 here without versioning the whole signature scheme.

use sha2::{Digest, Sha256};

/// Derived key size in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Derives a deterministic 256-bit key from a UTF-8 passphrase.
pub fn derive(passphrase: &str) -> [u8; KEY_LEN] {
    Sha256::digest(passphrase.as_bytes()).into()
}
