//! Crypto primitives for the Talon pipeline: Base64 transport encoding,
//! AES-GCM payload confidentiality, HMAC-SHA256 artifact integrity, and
//! SHA-256 passphrase key derivation.
//!
//! Nothing in this crate logs; callers decide what is safe to surface.

pub mod cipher;
pub mod codec;
pub mod kdf;
pub mod mac;
