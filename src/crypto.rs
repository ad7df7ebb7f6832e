//! Cryptographic utilities for credential values at rest.
//!
//! Credential environment variables may hold an AES-256-GCM encrypted value
//! instead of the plain secret. Encrypted values are hex strings carrying the
//! prefix [`ENCRYPTED_PREFIX`], and are decrypted with the key held in
//! `TWITTER_ENCRYPTION_KEY` when the configuration is loaded.

use aes_gcm::{
    aead::{generic_array::typenum::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use log::debug;
use std::env;

/// The length of the nonce in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

/// Name of the environment variable holding the hex-encoded 32-byte key.
pub const ENCRYPTION_KEY_VAR: &str = "TWITTER_ENCRYPTION_KEY";

/// Prefix marking a configuration value as encrypted.
pub const ENCRYPTED_PREFIX: &str = "enc:";

/// Parses a hex-encoded encryption key.
///
/// The key must be exactly 32 bytes (256 bits) encoded as a 64-character hex string.
///
/// # Returns
///
/// - `Ok([u8; 32])`: The 32-byte encryption key
/// - `Err`: If the key is invalid hex or has the wrong length
pub fn parse_encryption_key(
    key_hex: &str,
) -> Result<[u8; 32], Box<dyn std::error::Error + Send + Sync>> {
    let key_bytes = hex::decode(key_hex.trim()).map_err(|e| {
        format!(
            "{} is not valid hex: {}. Generate a key with: openssl rand -hex 32",
            ENCRYPTION_KEY_VAR, e
        )
    })?;

    if key_bytes.len() != 32 {
        return Err(format!(
            "{} must be exactly 32 bytes (64 hex chars), got {} bytes",
            ENCRYPTION_KEY_VAR,
            key_bytes.len()
        )
        .into());
    }

    let mut key: [u8; 32] = [0u8; 32];
    key.copy_from_slice(&key_bytes);
    Ok(key)
}

fn get_encryption_key() -> Result<[u8; 32], Box<dyn std::error::Error + Send + Sync>> {
    let key_hex = env::var(ENCRYPTION_KEY_VAR).map_err(|_| {
        format!(
            "{} environment variable is not set. Generate a 32-byte key with: openssl rand -hex 32",
            ENCRYPTION_KEY_VAR
        )
    })?;
    parse_encryption_key(&key_hex)
}

/// Encrypts a credential with the given key.
///
/// The output format is: hex(nonce (12 bytes) || ciphertext || auth_tag), without
/// the [`ENCRYPTED_PREFIX`].
pub fn encrypt_with_key(
    key: &[u8; 32],
    plaintext: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let cipher = Aes256Gcm::new_from_slice(key)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    getrandom::getrandom(&mut nonce_bytes)
        .map_err(|e| format!("Failed to generate random nonce: {}", e))?;
    let nonce: Nonce<U12> = nonce_bytes.into();

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| format!("Encryption failed: {}", e))?;

    let mut result = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    debug!("Credential encrypted successfully");
    Ok(hex::encode(result))
}

/// Decrypts a credential that was encrypted with [`encrypt_with_key`].
///
/// A leading [`ENCRYPTED_PREFIX`] is accepted and stripped.
///
/// # Returns
///
/// - `Ok(String)`: The decrypted credential
/// - `Err`: If decryption fails, the key is wrong, or the data is corrupted
pub fn decrypt_with_key(
    key: &[u8; 32],
    encrypted_hex: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let cipher = Aes256Gcm::new_from_slice(key)?;
    let encrypted_hex = encrypted_hex
        .strip_prefix(ENCRYPTED_PREFIX)
        .unwrap_or(encrypted_hex);

    let encrypted_bytes = hex::decode(encrypted_hex)
        .map_err(|e| format!("Invalid hex in encrypted credential: {}", e))?;

    if encrypted_bytes.len() < NONCE_LENGTH {
        return Err("Encrypted credential is too short".into());
    }

    let (nonce_bytes, ciphertext) = encrypted_bytes.split_at(NONCE_LENGTH);
    let nonce_array: [u8; NONCE_LENGTH] =
        nonce_bytes.try_into().map_err(|_| "Invalid nonce length")?;
    let nonce: Nonce<U12> = nonce_array.into();

    let plaintext = cipher
        .decrypt(&nonce, ciphertext)
        .map_err(|_| "Decryption failed - wrong key or corrupted data")?;

    let value = String::from_utf8(plaintext)
        .map_err(|e| format!("Decrypted credential is not valid UTF-8: {}", e))?;

    debug!("Credential decrypted successfully");
    Ok(value)
}

/// Encrypts a credential using the key from `TWITTER_ENCRYPTION_KEY`.
///
/// The returned value already carries the [`ENCRYPTED_PREFIX`] and can be
/// pasted into the matching environment variable as is.
pub fn encrypt_credential(
    plaintext: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let key = get_encryption_key()?;
    let encrypted = encrypt_with_key(&key, plaintext)?;
    Ok(format!("{}{}", ENCRYPTED_PREFIX, encrypted))
}

/// Returns `true` when the value is marked as encrypted.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}
