//! # Message Sealing
//!
//! Wraps encrypted payloads in relay events that leak as little metadata as
//! possible. Every envelope is authored by a single-use ephemeral keypair
//! whose secret is dropped immediately after signing, so the event's visible
//! author is meaningless and two envelopes from the same sender cannot be
//! linked by pubkey.
//!
//! ```text
//! plaintext
//!     │  inner: AES-256-GCM under sender ↔ recipient conversation key
//!     ▼
//! { sender, payload }                         identifies the real sender
//!     │  outer: AES-256-GCM under ephemeral ↔ recipient conversation key
//!     ▼
//! RelayEvent (ephemeral author, jittered created_at, p-tag recipient)
//! ```
//!
//! The `created_at` of an envelope is randomized within ±2 days, so relay
//! operators cannot build a precise activity timeline. What still leaks:
//! the recipient routing tag, the coarse timing of publication, and the
//! bucketed ciphertext size.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::{cipher, derive_conversation_key, KeyPair};
use crate::error::{Error, Result};
use crate::relay::{kind, EventDraft, RelayEvent};
use crate::time::{now_timestamp, randomize_timestamp};

/// Maximum distance of an envelope timestamp from the true time (2 days).
pub const TIMESTAMP_JITTER_SECS: i64 = 172_800;

/// Inner bundle carried by a sealed envelope: the real sender's identity
/// plus the payload ciphertext, both hidden from the relay by the outer
/// encryption layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedContent {
    sender: String,
    payload: String,
}

/// Seal `inner` for `recipient_public` under a fresh ephemeral keypair.
///
/// The returned event carries no link to the caller: its author is the
/// ephemeral key and its timestamp is jittered.
pub fn wrap(inner: &[u8], recipient_public: &str) -> Result<RelayEvent> {
    let ephemeral = KeyPair::generate();
    let mut key = derive_conversation_key(ephemeral.secret(), recipient_public)?;
    let content = cipher::encrypt(inner, &key);
    key.zeroize();

    let created_at = randomize_timestamp(now_timestamp(), TIMESTAMP_JITTER_SECS);
    EventDraft::addressed_to(
        ephemeral.public(),
        recipient_public,
        kind::SEALED_MESSAGE,
        created_at,
        content?,
    )
    .sign(ephemeral.secret())
}

/// Open an envelope addressed to the holder of `recipient_secret`.
pub fn unwrap(event: &RelayEvent, recipient_secret: &[u8]) -> Result<Vec<u8>> {
    if event.kind != kind::SEALED_MESSAGE {
        return Err(Error::MalformedEnvelope(format!(
            "expected kind {}, got {}",
            kind::SEALED_MESSAGE,
            event.kind
        )));
    }

    let mut key = derive_conversation_key(recipient_secret, &event.pubkey)?;
    let inner = cipher::decrypt(&event.content, &key);
    key.zeroize();
    inner
}

/// Encrypt `plaintext` from `sender` to `recipient_public` and seal it.
///
/// The inner layer uses the stable sender ↔ recipient conversation key, so
/// only the recipient learns who sent the message.
pub fn seal_message(
    sender: &KeyPair,
    recipient_public: &str,
    plaintext: &str,
) -> Result<RelayEvent> {
    let mut conversation_key = derive_conversation_key(sender.secret(), recipient_public)?;
    let payload = cipher::encrypt(plaintext.as_bytes(), &conversation_key);
    conversation_key.zeroize();

    let content = SealedContent {
        sender: sender.public().to_string(),
        payload: payload?,
    };
    wrap(&serde_json::to_vec(&content)?, recipient_public)
}

/// Open a sealed message. Returns the sender's public key and the plaintext.
pub fn open_message(event: &RelayEvent, recipient: &KeyPair) -> Result<(String, String)> {
    let inner = unwrap(event, recipient.secret())?;
    let content: SealedContent = serde_json::from_slice(&inner)
        .map_err(|e| Error::MalformedEnvelope(format!("inner bundle is not valid JSON: {}", e)))?;

    let mut conversation_key = derive_conversation_key(recipient.secret(), &content.sender)?;
    let plaintext_bytes = cipher::decrypt(&content.payload, &conversation_key);
    conversation_key.zeroize();

    let plaintext = String::from_utf8(plaintext_bytes?)
        .map_err(|_| Error::MalformedEnvelope("payload is not valid UTF-8".into()))?;
    Ok((content.sender, plaintext))
}

// ============================================================================
// TESTS
// ============================================================================
