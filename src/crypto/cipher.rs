//! # Payload Cipher
//!
//! Authenticated encryption of padded plaintext with AES-256-GCM.
//!
//! Wire format: `base64( nonce ‖ ciphertext ‖ tag )` with a 12-byte nonce
//! drawn fresh from the OS RNG on every call. Nonces are never derived from
//! counters; a random draw cannot repeat across process restarts without
//! persisted state, which structurally rules out nonce reuse under one key.
//!
//! Decryption verifies the authentication tag before returning anything and
//! collapses every failure into [`Error::AuthenticationFailed`] so callers
//! cannot distinguish a bad tag from a malformed blob.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::padding;
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Encrypt `plaintext` under `key`: pad, seal, encode.
///
/// Two calls with identical inputs produce different ciphertexts (fresh
/// nonce, random filler) that both decrypt to the same plaintext.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_SIZE]) -> Result<String> {
    let padded = padding::pad(plaintext)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| Error::EncryptionFailed("invalid key length".into()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), padded.as_slice())
        .map_err(|_| Error::EncryptionFailed("AEAD encryption failed".into()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&blob))
}

/// Decrypt a blob produced by [`encrypt`], verifying the tag first.
///
/// Fails with [`Error::AuthenticationFailed`] on any tampering, wrong key, or
/// undecodable input; never returns corrupted plaintext.
pub fn decrypt(blob: &str, key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    let bytes = BASE64
        .decode(blob)
        .map_err(|_| Error::AuthenticationFailed)?;

    if bytes.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::AuthenticationFailed);
    }
    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::AuthenticationFailed)?;
    let padded = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| Error::AuthenticationFailed)?;

    Ok(padding::unpad(&padded))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = [42u8; KEY_SIZE];
        let plaintext = b"Hello, secure world!";

        let blob = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&blob, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_independent_encryptions_differ() {
        let key = [42u8; KEY_SIZE];
        let plaintext = b"same message";

        let blob1 = encrypt(plaintext, &key).unwrap();
        let blob2 = encrypt(plaintext, &key).unwrap();

        assert_ne!(blob1, blob2);
        assert_eq!(decrypt(&blob1, &key).unwrap(), plaintext);
        assert_eq!(decrypt(&blob2, &key).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = encrypt(b"secret", &[1u8; KEY_SIZE]).unwrap();
        assert_eq!(
            decrypt(&blob, &[2u8; KEY_SIZE]),
            Err(Error::AuthenticationFailed)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = [42u8; KEY_SIZE];
        let blob = encrypt(b"do not touch", &key).unwrap();

        let mut bytes = BASE64.decode(&blob).unwrap();
        // Flip one bit in the ciphertext body
        let idx = NONCE_SIZE + 3;
        bytes[idx] ^= 0x01;
        let tampered = BASE64.encode(&bytes);

        assert_eq!(decrypt(&tampered, &key), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn test_garbage_blobs_fail_uniformly() {
        let key = [42u8; KEY_SIZE];
        assert_eq!(decrypt("", &key), Err(Error::AuthenticationFailed));
        assert_eq!(decrypt("!!!not base64!!!", &key), Err(Error::AuthenticationFailed));
        assert_eq!(
            decrypt(&BASE64.encode([0u8; 8]), &key),
            Err(Error::AuthenticationFailed)
        );
    }

    #[test]
    fn test_empty_plaintext() {
        let key = [7u8; KEY_SIZE];
        let blob = encrypt(b"", &key).unwrap();
        assert!(decrypt(&blob, &key).unwrap().is_empty());
    }

    #[test]
    fn test_ciphertext_length_hides_exact_size() {
        let key = [9u8; KEY_SIZE];
        // 10 and 19 bytes both land in the 32-byte bucket
        let a = BASE64.decode(encrypt(&[0u8; 10], &key).unwrap()).unwrap();
        let b = BASE64.decode(encrypt(&[0u8; 19], &key).unwrap()).unwrap();
        assert_eq!(a.len(), b.len());
    }
}
