//! # Cryptography Module
//!
//! All cryptographic primitives used by Veil Core.
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Why |
//! |-----------|---------|-----|
//! | secp256k1 ECDH | Key agreement | 33/65-byte points, x-only wire keys |
//! | BIP-340 Schnorr | Event signatures | Matches the relay event format |
//! | HKDF-SHA256 | Conversation keys | Industry standard, domain-separated |
//! | AES-256-GCM | Payload encryption | Hardware acceleration, AEAD |
//! | PBKDF2-SHA256 | Passphrase stretching | Deliberately slow, 310k rounds |
//!
//! ## Security Considerations
//!
//! 1. Secret keys and derived key material are zeroized when dropped
//! 2. Nonces and salts always come from `OsRng`, never from counters
//! 3. AEAD tags are verified before any plaintext is released

pub mod agreement;
pub mod cipher;
pub mod fingerprint;
pub mod keys;
pub mod padding;
pub mod vault;

pub use agreement::derive_conversation_key;
pub use cipher::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use fingerprint::{derive_fingerprint, Fingerprint, FINGERPRINT_LEN, SYMBOLS};
pub use keys::{KeyPair, SECRET_KEY_SIZE};
pub use padding::{BUCKET_SIZES, HEADER_LEN, MAX_PLAINTEXT_LEN};
pub use vault::{PassphraseVault, TransferVault, PBKDF2_ITERATIONS};
