//! # Veil Core
//!
//! Confidentiality and key-custody core for relay-based messaging. Relays
//! are treated as honest-but-curious: they store and forward events but must
//! learn nothing beyond what routing strictly requires.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Embedding app                        │
//! └──────────────┬─────────────────────────────┬───────────────┘
//!                │ messages                    │ device pairing
//!                ▼                             ▼
//!        ┌──────────────┐              ┌───────────────┐
//!        │     seal     │              │    pairing    │
//!        │ wrap/unwrap  │              │ session + QR  │
//!        └──────┬───────┘              └───────┬───────┘
//!               │                              │
//!               ▼                              ▼
//!        ┌─────────────────────────────────────────────┐
//!        │                   crypto                    │
//!        │  agreement · padding · cipher · vault · fp  │
//!        └──────────────────────┬──────────────────────┘
//!                               ▼
//!        ┌─────────────────────────────────────────────┐
//!        │          relay (RelayCoordinator)           │
//!        │      signed events, opaque ciphertext       │
//!        └─────────────────────────────────────────────┘
//! ```
//!
//! What a relay sees per event: an ephemeral author key, a recipient routing
//! tag, a timestamp jittered by up to two days, and a size-bucketed
//! ciphertext. What it never sees: plaintext, sender identity, exact send
//! time, or exact message length.
//!
//! ## Quick start
//!
//! ```no_run
//! use veil_core::crypto::KeyPair;
//! use veil_core::seal;
//!
//! # fn main() -> veil_core::Result<()> {
//! let alice = KeyPair::generate();
//! let bob = KeyPair::generate();
//!
//! let envelope = seal::seal_message(&alice, bob.public(), "Hello, secure world!")?;
//! let (sender, plaintext) = seal::open_message(&envelope, &bob)?;
//!
//! assert_eq!(sender, alice.public());
//! assert_eq!(plaintext, "Hello, secure world!");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod pairing;
pub mod relay;
pub mod seal;
pub mod time;

pub use error::{Error, Result};

pub use crypto::{derive_fingerprint, Fingerprint, KeyPair};
pub use pairing::{PairingRole, PairingSession, PairingStatus, SessionRegistry, TransferDescriptor};
pub use relay::{EventDraft, Filter, MemoryRelay, RelayCoordinator, RelayEvent};
pub use seal::{open_message, seal_message};
