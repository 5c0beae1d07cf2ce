//! # Key Material
//!
//! secp256k1 keypair generation and public-key parsing.
//!
//! Public keys travel on the wire as hex strings. Three encodings are
//! accepted when parsing, all describing the same curve point:
//!
//! - 32 bytes: x-only (the form this core emits). The y parity is not
//!   encoded; both prefixes are tried. ECDH only uses the x-coordinate of
//!   the shared point, so the parity guess never changes a derived key.
//! - 33 bytes: SEC1 compressed (`02`/`03` prefix)
//! - 65 bytes: SEC1 uncompressed (`04` prefix)

use std::fmt;

use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of a secret key in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// An ephemeral or identity keypair.
///
/// The secret half is zeroized when the keypair is dropped. `Debug` redacts
/// the secret so it cannot leak through logs.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyPair {
    secret: Vec<u8>,
    #[zeroize(skip)]
    public: String,
}

impl KeyPair {
    /// Generate a fresh random keypair from the OS RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);

        Self {
            secret: secret_key.secret_bytes().to_vec(),
            // x-only public key, 32 bytes as hex
            public: hex::encode(&public_key.serialize()[1..]),
        }
    }

    /// Reconstruct a keypair from raw secret bytes.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let public = public_key_hex(secret)?;
        Ok(Self {
            secret: secret.to_vec(),
            public,
        })
    }

    /// Raw secret key bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Hex-encoded x-only public key.
    pub fn public(&self) -> &str {
        &self.public
    }

    /// Wipe the secret half in place, keeping the public key usable.
    ///
    /// After wiping, [`secret`](Self::secret) returns an empty slice and any
    /// signing or derivation with this keypair fails key validation.
    pub fn wipe_secret(&mut self) {
        self.secret.zeroize();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("secret", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}

/// Compute the hex-encoded x-only public key for a secret key.
pub fn public_key_hex(secret: &[u8]) -> Result<String> {
    let secret_key = parse_secret_key(secret)?;
    let secp = Secp256k1::new();
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);
    Ok(hex::encode(&public_key.serialize()[1..]))
}

/// Parse raw secret key bytes, rejecting out-of-range scalars.
pub fn parse_secret_key(secret: &[u8]) -> Result<SecretKey> {
    if secret.len() != SECRET_KEY_SIZE {
        return Err(Error::InvalidKey(format!(
            "secret key must be {} bytes, got {}",
            SECRET_KEY_SIZE,
            secret.len()
        )));
    }
    SecretKey::from_slice(secret)
        .map_err(|_| Error::InvalidKey("secret key is not a valid scalar".into()))
}

/// Parse a hex-encoded public key in x-only, compressed, or uncompressed form.
pub fn parse_public_key(public_hex: &str) -> Result<PublicKey> {
    let bytes = hex::decode(public_hex)
        .map_err(|_| Error::InvalidKey("public key is not valid hex".into()))?;

    match bytes.len() {
        // x-only: try the even prefix first, fall back to odd
        32 => {
            let mut compressed = [0u8; 33];
            compressed[1..].copy_from_slice(&bytes);

            compressed[0] = 0x02;
            if let Ok(pk) = PublicKey::from_slice(&compressed) {
                return Ok(pk);
            }
            compressed[0] = 0x03;
            PublicKey::from_slice(&compressed)
                .map_err(|_| Error::InvalidKey("x-only public key is not on the curve".into()))
        }
        33 | 65 => PublicKey::from_slice(&bytes)
            .map_err(|_| Error::InvalidKey("public key is not a valid curve point".into())),
        n => Err(Error::InvalidKey(format!(
            "public key must be 32, 33 or 65 bytes, got {}",
            n
        ))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
