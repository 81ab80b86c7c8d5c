//! AES-GCM authenticated encryption with an IV-prepended envelope.
//!
//! Envelope layout: `IV (12 bytes) || ciphertext || tag (16 bytes)`. No AAD
//! is bound, and no version byte is emitted. The key length is authoritative:
//! 16, 24, and 32 bytes select AES-128, AES-192, and AES-256.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use rand::RngCore;

use talon_core::{EngineError, Result};

/// GCM IV length in bytes (96 bits).
pub const GCM_IV_LEN: usize = 12;

/// GCM authentication tag length in bytes (128 bits).
pub const GCM_TAG_LEN: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Encrypts a UTF-8 string, returning `IV || ciphertext || tag`.
///
/// A fresh random IV is drawn from the OS CSPRNG per call.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; GCM_IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = seal(key, &iv, plaintext.as_bytes())?;

    let mut envelope = Vec::with_capacity(GCM_IV_LEN + ciphertext.len());
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decrypts an envelope produced by [`encrypt`], returning the UTF-8
/// plaintext.
///
/// Fails on a truncated envelope, an authentication tag mismatch, or
/// plaintext that is not valid UTF-8.
pub fn decrypt(envelope: &[u8], key: &[u8]) -> Result<String> {
    if envelope.len() <= GCM_IV_LEN {
        return Err(EngineError::Crypto(format!(
            "envelope too short: {} bytes",
            envelope.len()
        )));
    }

    let (iv, ciphertext) = envelope.split_at(GCM_IV_LEN);
    let plaintext = open(key, iv, ciphertext)?;

    String::from_utf8(plaintext)
        .map_err(|_| EngineError::Crypto("decrypted payload is not valid UTF-8".into()))
}

fn seal(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = GenericArray::from_slice(iv);
    match key.len() {
        16 => Aes128Gcm::new(GenericArray::from_slice(key))
            .encrypt(nonce, plaintext)
            .map_err(|e| EngineError::Crypto(format!("AES-128-GCM encryption failed: {e}"))),
        24 => Aes192Gcm::new(GenericArray::from_slice(key))
            .encrypt(nonce, plaintext)
            .map_err(|e| EngineError::Crypto(format!("AES-192-GCM encryption failed: {e}"))),
        32 => Aes256Gcm::new(GenericArray::from_slice(key))
            .encrypt(nonce, plaintext)
            .map_err(|e| EngineError::Crypto(format!("AES-256-GCM encryption failed: {e}"))),
        n => Err(EngineError::Crypto(format!(
            "unsupported AES key length: {n} bytes"
        ))),
    }
}

fn open(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let nonce = GenericArray::from_slice(iv);
    match key.len() {
        16 => Aes128Gcm::new(GenericArray::from_slice(key))
            .decrypt(nonce, ciphertext)
            .map_err(|e| EngineError::Crypto(format!("AES-128-GCM decryption failed: {e}"))),
        24 => Aes192Gcm::new(GenericArray::from_slice(key))
            .decrypt(nonce, ciphertext)
            .map_err(|e| EngineError::Crypto(format!("AES-192-GCM decryption failed: {e}"))),
        32 => Aes256Gcm::new(GenericArray::from_slice(key))
            .decrypt(nonce, ciphertext)
            .map_err(|e| EngineError::Crypto(format!("AES-256-GCM decryption failed: {e}"))),
        n => Err(EngineError::Crypto(format!(
            "unsupported AES key length: {n} bytes"
        ))),
    }
}
