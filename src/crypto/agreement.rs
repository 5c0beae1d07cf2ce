//! # Key Agreement
//!
//! Derives the deterministic 32-byte conversation key shared by two parties:
//!
//! ```text
//! ECDH(local_secret, remote_public)        secp256k1 shared point
//!         │
//!         ▼  x-coordinate only
//! SHA-256(x)                               shared secret
//!         │
//!         ▼  HKDF-SHA256(salt, info)
//! ConversationKey (32 bytes)
//! ```
//!
//! The base correctness property for everything built on top:
//! `derive(A_priv, B_pub) == derive(B_priv, A_pub)`, bit for bit.
//!
//! Keys are recomputed on demand and never persisted by this crate.

use hkdf::Hkdf;
use secp256k1::ecdh::shared_secret_point;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::crypto::keys::{parse_public_key, parse_secret_key};
use crate::error::{Error, Result};

/// HKDF salt identifying this protocol and version.
///
/// Bumping the version here invalidates every derived key, which is the
/// intended upgrade path for the derivation scheme.
const CONVERSATION_SALT: &[u8] = b"veil-conversation-v1";

/// HKDF info string identifying the derived key's purpose.
const CONVERSATION_INFO: &[u8] = b"message-encryption";

/// Derive the symmetric conversation key for (local secret, remote public).
///
/// Returns [`Error::InvalidKey`] if either key is not a valid scalar/point.
pub fn derive_conversation_key(local_secret: &[u8], remote_public: &str) -> Result<[u8; 32]> {
    let secret_key = parse_secret_key(local_secret)?;
    let public_key = parse_public_key(remote_public)?;

    // shared_secret_point yields the full (x, y) point; only x is used, which
    // also makes the derivation independent of the y-parity guess made when
    // parsing x-only public keys.
    let mut shared_point = shared_secret_point(&public_key, &secret_key);
    let mut shared_secret: [u8; 32] = Sha256::digest(&shared_point[..32]).into();

    let hkdf = Hkdf::<Sha256>::new(Some(CONVERSATION_SALT), &shared_secret);
    let mut key = [0u8; 32];
    let expanded = hkdf
        .expand(CONVERSATION_INFO, &mut key)
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()));

    shared_point.zeroize();
    shared_secret.zeroize();

    expanded?;
    Ok(key)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn test_derivation_is_symmetric() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let key_ab = derive_conversation_key(alice.secret(), bob.public()).unwrap();
        let key_ba = derive_conversation_key(bob.secret(), alice.public()).unwrap();

        assert_eq!(key_ab, key_ba);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let key1 = derive_conversation_key(alice.secret(), bob.public()).unwrap();
        let key2 = derive_conversation_key(alice.secret(), bob.public()).unwrap();

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_different_peers_different_keys() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();

        let key_ab = derive_conversation_key(alice.secret(), bob.public()).unwrap();
        let key_ac = derive_conversation_key(alice.secret(), carol.public()).unwrap();

        assert_ne!(key_ab, key_ac);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let alice = KeyPair::generate();

        assert!(matches!(
            derive_conversation_key(&[0u8; 32], alice.public()),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            derive_conversation_key(alice.secret(), "zzzz"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_symmetry_holds_for_odd_parity_keys() {
        // Generate until we hit a keypair whose full public key has an odd
        // y-coordinate, then check both directions still agree through the
        // x-only encoding.
        for _ in 0..64 {
            let a = KeyPair::generate();
            let b = KeyPair::generate();
            let key_ab = derive_conversation_key(a.secret(), b.public()).unwrap();
            let key_ba = derive_conversation_key(b.secret(), a.public()).unwrap();
            assert_eq!(key_ab, key_ba);
        }
    }
}
