//! # Double Encryption Vault
//!
//! Two nested layers protect a private key while it crosses the relay
//! network during device pairing:
//!
//! ```text
//! private key
//!     │  layer 1: AES-256-GCM under PBKDF2(passphrase)
//!     ▼
//! PassphraseVault { ciphertext, salt, nonce }
//!     │  layer 2: AES-256-GCM under the session transfer key
//!     ▼
//! TransferVault { payload, nonce }          ← what travels on the wire
//! ```
//!
//! The two layers fail with distinct errors on purpose: a layer-2 failure
//! ([`Error::TransferCorrupted`]) means the payload was damaged or
//! intercepted and pairing must restart; a layer-1 failure
//! ([`Error::WrongPassphrase`]) means the user mistyped and may retry.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::crypto::cipher::{KEY_SIZE, NONCE_SIZE};
use crate::error::{Error, Result};

/// PBKDF2-HMAC-SHA256 iteration count (OWASP-recommended floor for SHA-256).
pub const PBKDF2_ITERATIONS: u32 = 310_000;

/// Size of the random passphrase salt in bytes.
pub const SALT_SIZE: usize = 32;

/// Layer 1: a private key sealed under a user passphrase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PassphraseVault {
    /// AES-GCM ciphertext of the raw private key, base64
    pub ciphertext: String,
    /// Fresh random PBKDF2 salt, base64
    pub salt: String,
    /// AES-GCM nonce, base64
    pub nonce: String,
}

/// Layer 2: a serialized [`PassphraseVault`] sealed under the transfer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferVault {
    /// AES-GCM ciphertext of the layer-1 bundle, base64
    pub payload: String,
    /// AES-GCM nonce, base64
    pub nonce: String,
}

/// Seal a raw private key under a user passphrase (layer 1).
pub fn lock_with_passphrase(private_key: &[u8], passphrase: &str) -> Result<PassphraseVault> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let mut key = derive_passphrase_key(passphrase, &salt);

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| Error::EncryptionFailed("invalid key length".into()));
    key.zeroize();
    let ciphertext = cipher?
        .encrypt(Nonce::from_slice(&nonce), private_key)
        .map_err(|_| Error::EncryptionFailed("passphrase layer encryption failed".into()))?;

    Ok(PassphraseVault {
        ciphertext: BASE64.encode(&ciphertext),
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce),
    })
}

/// Open a layer-1 vault. Fails with [`Error::WrongPassphrase`] when the
/// passphrase does not match; the recoverable case.
pub fn unlock_with_passphrase(vault: &PassphraseVault, passphrase: &str) -> Result<Vec<u8>> {
    let ciphertext = decode_field(&vault.ciphertext, "ciphertext")?;
    let salt = decode_field(&vault.salt, "salt")?;
    let nonce = decode_field(&vault.nonce, "nonce")?;
    if nonce.len() != NONCE_SIZE {
        return Err(Error::Serialization("vault nonce has wrong length".into()));
    }

    let mut key = derive_passphrase_key(passphrase, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| Error::WrongPassphrase);
    key.zeroize();

    cipher?
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| Error::WrongPassphrase)
}

/// Seal a layer-1 vault under the session transfer key (layer 2).
pub fn seal_for_transfer(
    vault: &PassphraseVault,
    transfer_key: &[u8; KEY_SIZE],
) -> Result<TransferVault> {
    let serialized = serde_json::to_vec(vault)?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(transfer_key)
        .map_err(|_| Error::EncryptionFailed("invalid key length".into()))?;
    let payload = cipher
        .encrypt(Nonce::from_slice(&nonce), serialized.as_slice())
        .map_err(|_| Error::EncryptionFailed("transfer layer encryption failed".into()))?;

    Ok(TransferVault {
        payload: BASE64.encode(&payload),
        nonce: BASE64.encode(nonce),
    })
}

/// Open a layer-2 vault. Fails with [`Error::TransferCorrupted`] when the
/// payload was damaged or the transfer key disagrees; the unrecoverable
/// case that forces a pairing restart.
pub fn open_from_transfer(
    sealed: &TransferVault,
    transfer_key: &[u8; KEY_SIZE],
) -> Result<PassphraseVault> {
    let payload = BASE64
        .decode(&sealed.payload)
        .map_err(|_| Error::TransferCorrupted)?;
    let nonce = BASE64
        .decode(&sealed.nonce)
        .map_err(|_| Error::TransferCorrupted)?;
    if nonce.len() != NONCE_SIZE {
        return Err(Error::TransferCorrupted);
    }

    let cipher = Aes256Gcm::new_from_slice(transfer_key).map_err(|_| Error::TransferCorrupted)?;
    let serialized = cipher
        .decrypt(Nonce::from_slice(&nonce), payload.as_slice())
        .map_err(|_| Error::TransferCorrupted)?;

    serde_json::from_slice(&serialized).map_err(|_| Error::TransferCorrupted)
}

/// Stretch a passphrase into a 256-bit key. Deliberately slow.
fn derive_passphrase_key(passphrase: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

fn decode_field(value: &str, name: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|_| Error::Serialization(format!("vault field '{}' is not valid base64", name)))
}

// ============================================================================
// TESTS
// ============================================================================
