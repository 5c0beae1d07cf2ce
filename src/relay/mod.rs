//! # Relay Module
//!
//! Transport boundary between the confidentiality core and the outside
//! world. Relays are untrusted publish/subscribe brokers: they see signed
//! events with opaque content, a recipient routing tag, and a randomized
//! timestamp, and nothing else.
//!
//! ```text
//!   seal / pairing ──▶ RelayCoordinator::publish ──▶ relay network
//!   seal / pairing ◀── RelayCoordinator::subscribe ◀── relay network
//! ```
//!
//! [`MemoryRelay`] is an in-process coordinator used by the pairing drivers
//! in tests and by embedders that bridge their own transport.

pub mod event;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;

pub use event::{EventDraft, RelayEvent};

/// Distinguished event kinds.
pub mod kind {
    /// A sealed message envelope, authored by a one-time ephemeral key.
    pub const SEALED_MESSAGE: i32 = 1059;
    /// Pairing handshake from the receiving device to the initiator.
    pub const PAIRING_HANDSHAKE: i32 = 24200;
    /// Double-encrypted private key payload.
    pub const KEY_TRANSFER: i32 = 24201;
    /// Receipt confirming the transferred key was recovered.
    pub const TRANSFER_ACK: i32 = 24202;
}

/// Stream of events delivered by a subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send>>;

/// Subscription criteria. All populated fields must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<i32>>,
    /// Recipient pubkeys to match against `p` tags
    #[serde(rename = "#p", skip_serializing_if = "Option::is_none")]
    pub p_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = i32>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn recipient(mut self, pubkey: impl Into<String>) -> Self {
        self.p_tags.get_or_insert_with(Vec::new).push(pubkey.into());
        self
    }

    pub fn since(mut self, timestamp: i64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Whether `event` satisfies every populated criterion.
    pub fn matches(&self, event: &RelayEvent) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(p_tags) = &self.p_tags {
            let tagged = event
                .tags
                .iter()
                .filter(|tag| tag.len() >= 2 && tag[0] == "p")
                .any(|tag| p_tags.contains(&tag[1]));
            if !tagged {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        true
    }
}

/// Abstract publish/subscribe transport.
///
/// Implementations carry already-sealed events; nothing behind this trait
/// ever sees plaintext or key material.
#[async_trait]
pub trait RelayCoordinator: Send + Sync {
    /// Publish a signed event to the network.
    async fn publish(&self, event: RelayEvent) -> Result<()>;

    /// Subscribe to events matching `filter`. Events published before the
    /// subscription was established are not replayed.
    async fn subscribe(&self, filter: Filter) -> Result<EventStream>;
}

/// In-process coordinator backed by a broadcast channel.
pub struct MemoryRelay {
    sender: broadcast::Sender<RelayEvent>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayCoordinator for MemoryRelay {
    async fn publish(&self, event: RelayEvent) -> Result<()> {
        // No subscribers yet is not a failure
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, filter: Filter) -> Result<EventStream> {
        let mut receiver = self.sender.subscribe();
        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) if filter.matches(&event) => yield event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

// ============================================================================
// TESTS
// ============================================================================
