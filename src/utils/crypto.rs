// Cryptographic helpers for sealing credentials at rest

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Nonce size for AES-256-GCM encryption (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Encryption key size for AES-256 (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Derive a 32-byte AES key from secret material of any length
#[must_use]
pub fn derive_encryption_key(secret: &[u8]) -> [u8; ENCRYPTION_KEY_SIZE] {
    Sha256::digest(secret).into()
}

/// Generate a random base64 secret with 256 bits of entropy
#[must_use]
pub fn generate_secret() -> String {
    let mut secret = [0u8; ENCRYPTION_KEY_SIZE];
    rand::rng().fill_bytes(&mut secret);
    general_purpose::STANDARD.encode(secret)
}

/// Serialize `value` to JSON and encrypt it
///
/// The output is base64url(nonce || ciphertext).
///
/// # Errors
///
/// Returns an error if serialization or encryption fails
pub fn seal<T: Serialize>(value: &T, key: &[u8; ENCRYPTION_KEY_SIZE]) -> Result<String> {
    let plaintext = serde_json::to_vec(value).context("Failed to serialize data")?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
        .map_err(|e| anyhow!("AES encryption failed: {e}"))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(combined))
}

/// Decrypt output of [`seal`] and deserialize it
///
/// # Errors
///
/// Returns an error if the input is not valid base64, is truncated, fails
/// authentication under `key`, or does not deserialize into `T`
pub fn open<T: DeserializeOwned>(sealed: &str, key: &[u8; ENCRYPTION_KEY_SIZE]) -> Result<T> {
    let combined = general_purpose::URL_SAFE_NO_PAD
        .decode(sealed.trim())
        .context("Failed to decode base64 data")?;

    if combined.len() < NONCE_SIZE {
        return Err(anyhow!("Invalid data length"));
    }
    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| anyhow!("AES decryption failed: {e}"))?;

    serde_json::from_slice(&plaintext).context("Failed to deserialize decrypted JSON")
}
