//! # Relay Events
//!
//! The unit of exchange on the relay network. An event is authored by a
//! public key, tagged with routing metadata, and Schnorr-signed (BIP-340).
//! For sealed envelopes the author is a one-time ephemeral key, so the
//! signature proves only internal consistency, not a real-world identity.
//!
//! The event id is the SHA-256 of the canonical serialization
//! `[0, pubkey, created_at, kind, tags, content]`.

use secp256k1::{schnorr, Keypair, Message, Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::keys::parse_secret_key;
use crate::error::{Error, Result};

/// An unsigned event under construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    /// Author public key, hex x-only
    pub pubkey: String,
    /// Unix timestamp in seconds (already randomized for sealed envelopes)
    pub created_at: i64,
    /// Distinguished kind identifier (see [`crate::relay::kind`])
    pub kind: i32,
    /// Routing tags; `["p", <pubkey>]` addresses a recipient
    pub tags: Vec<Vec<String>>,
    /// Opaque content, ciphertext for everything this core emits
    pub content: String,
}

/// A signed event as published to and received from relays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: i32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl EventDraft {
    /// Create a draft addressed to `recipient` via a `p` tag.
    pub fn addressed_to(
        pubkey: impl Into<String>,
        recipient: &str,
        kind: i32,
        created_at: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            pubkey: pubkey.into(),
            created_at,
            kind,
            tags: vec![vec!["p".to_string(), recipient.to_string()]],
            content: content.into(),
        }
    }

    /// Compute the event id (SHA-256 of the canonical serialization).
    pub fn id(&self) -> Result<String> {
        let canonical = serde_json::to_string(&serde_json::json!([
            0,
            self.pubkey,
            self.created_at,
            self.kind,
            self.tags,
            self.content
        ]))?;
        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    /// Sign the draft with `secret`, producing a publishable event.
    pub fn sign(self, secret: &[u8]) -> Result<RelayEvent> {
        let secret_key = parse_secret_key(secret)?;

        let id = self.id()?;
        let id_bytes = hex::decode(&id).map_err(|_| Error::SigningFailed)?;
        let message = Message::from_digest_slice(&id_bytes).map_err(|_| Error::SigningFailed)?;

        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let signature = secp.sign_schnorr_with_rng(&message, &keypair, &mut rand::rngs::OsRng);

        Ok(RelayEvent {
            id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: hex::encode(signature.serialize()),
        })
    }
}

impl RelayEvent {
    /// Verify the event id and Schnorr signature.
    pub fn verify(&self) -> bool {
        let draft = EventDraft {
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        };

        let expected_id = match draft.id() {
            Ok(id) => id,
            Err(_) => return false,
        };
        if self.id != expected_id {
            return false;
        }

        let Ok(pubkey_bytes) = hex::decode(&self.pubkey) else {
            return false;
        };
        let Ok(pubkey) = XOnlyPublicKey::from_slice(&pubkey_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(&self.sig) else {
            return false;
        };
        let Ok(signature) = schnorr::Signature::from_slice(&sig_bytes) else {
            return false;
        };
        let Ok(id_bytes) = hex::decode(&self.id) else {
            return false;
        };
        let Ok(message) = Message::from_digest_slice(&id_bytes) else {
            return false;
        };

        Secp256k1::new()
            .verify_schnorr(&signature, &message, &pubkey)
            .is_ok()
    }

    /// First `p`-tagged recipient, if any. This routing tag is the one piece
    /// of metadata a relay must see to deliver the event.
    pub fn recipient(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.len() >= 2 && tag[0] == "p")
            .map(|tag| tag[1].as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
