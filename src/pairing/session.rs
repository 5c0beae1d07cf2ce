//! # Pairing Session
//!
//! State machine for transferring a private key between two devices over
//! untrusted relays.
//!
//! ```text
//!  Initiator (has key)                         Receiver (wants key)
//!  ───────────────────                         ────────────────────
//!  initiate ─▶ descriptor (QR) ─ ─ ─ ─ ─ ─ ─▶  scan
//!  AwaitingScan                                Connected
//!       ◀─────────── handshake event ────────  (publishes handshake)
//!  accept_handshake ─▶ Connected
//!  prepare_key_transfer ─▶ Authenticating
//!       ──────────── key transfer ──────────▶  Authenticating
//!  mark_payload_published ─▶ Transferring      receive_private_key
//!       ◀──────────────── ack ───────────────  Completed
//!  accept_ack ─▶ Completed
//! ```
//!
//! Both sides use single-session ephemeral keypairs; the identity key being
//! transferred never authors a relay event. Every non-terminal state is
//! bounded by the session TTL, and each network step additionally has its
//! own timeout. A wrong passphrase on the receiving side is the one
//! recoverable failure: the session stays in `Authenticating` and the
//! unlock may be retried without restarting the handshake.

use futures::StreamExt;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::crypto::vault::{
    lock_with_passphrase, open_from_transfer, seal_for_transfer, unlock_with_passphrase,
    PassphraseVault, TransferVault,
};
use crate::crypto::{derive_conversation_key, derive_fingerprint, Fingerprint, KeyPair, KEY_SIZE};
use crate::error::{Error, Result};
use crate::pairing::descriptor::{TransferDescriptor, DESCRIPTOR_TYPE, DESCRIPTOR_VERSION};
use crate::relay::{kind, EventDraft, Filter, RelayCoordinator, RelayEvent};
use crate::time::now_timestamp;

/// Lifetime of a pairing session from initiation (5 minutes).
pub const SESSION_TTL_SECS: i64 = 300;

/// Timeout for each individual network step.
pub const STEP_TIMEOUT_SECS: u64 = 60;

/// Which side of the transfer this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingRole {
    /// Holds the private key and displays the descriptor.
    Initiator,
    /// Scans the descriptor and receives the key.
    Receiver,
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStatus {
    /// Initiator is waiting for a device to scan the descriptor.
    AwaitingScan,
    /// Handshake complete, transfer key established on this side.
    Connected,
    /// Key payload is being prepared or unlocked.
    Authenticating,
    /// Payload published, waiting for the receipt.
    Transferring,
    Completed,
    Failed,
    Expired,
}

impl PairingStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

/// Plaintext handshake published by the receiver. Carries no secrets; the
/// signature binds the ephemeral key to the session id.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeContent {
    session_id: String,
    public_key: String,
}

/// Receipt published by the receiver after recovering the key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AckContent {
    session_id: String,
}

/// One side of a device-pairing key transfer.
pub struct PairingSession {
    pub id: String,
    pub role: PairingRole,
    pub status: PairingStatus,
    pub relays: Vec<String>,
    pub created_at: i64,
    pub expires_at: i64,
    /// Last recorded failure, kept across the recoverable retry path
    pub last_error: Option<Error>,
    ephemeral: KeyPair,
    remote_public: Option<String>,
    transfer_key: Option<[u8; KEY_SIZE]>,
    /// Layer-1 vault awaiting a successful passphrase unlock
    pending: Option<PassphraseVault>,
}

impl std::fmt::Debug for PairingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingSession")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl PairingSession {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Start a session on the device that holds the private key.
    ///
    /// Returns the session and the descriptor to display as a QR code.
    pub fn initiate(
        relays: Vec<String>,
        device_name: Option<String>,
    ) -> (Self, TransferDescriptor) {
        let ephemeral = KeyPair::generate();
        let created_at = now_timestamp();
        let expires_at = created_at + SESSION_TTL_SECS;

        let mut id_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut id_bytes);
        let id = hex::encode(id_bytes);

        let descriptor = TransferDescriptor {
            version: DESCRIPTOR_VERSION,
            kind: DESCRIPTOR_TYPE.to_string(),
            session_id: id.clone(),
            public_key: ephemeral.public().to_string(),
            relays: relays.clone(),
            expires_at,
            device_name,
        };

        let session = Self {
            id,
            role: PairingRole::Initiator,
            status: PairingStatus::AwaitingScan,
            relays,
            created_at,
            expires_at,
            last_error: None,
            ephemeral,
            remote_public: None,
            transfer_key: None,
            pending: None,
        };
        (session, descriptor)
    }

    /// Join a session on the receiving device by scanning a descriptor URI.
    ///
    /// Returns the session and the handshake event to publish. The transfer
    /// key is derived immediately; an expired descriptor is refused before
    /// any key material is touched.
    pub fn scan(uri: &str) -> Result<(Self, RelayEvent)> {
        let descriptor = TransferDescriptor::decode(uri)?;
        if descriptor.is_expired(now_timestamp()) {
            return Err(Error::SessionExpired);
        }

        let ephemeral = KeyPair::generate();
        let transfer_key = derive_conversation_key(ephemeral.secret(), &descriptor.public_key)?;

        let handshake = serde_json::to_string(&HandshakeContent {
            session_id: descriptor.session_id.clone(),
            public_key: ephemeral.public().to_string(),
        })?;
        let event = EventDraft::addressed_to(
            ephemeral.public(),
            &descriptor.public_key,
            kind::PAIRING_HANDSHAKE,
            now_timestamp(),
            handshake,
        )
        .sign(ephemeral.secret())?;

        let session = Self {
            id: descriptor.session_id,
            role: PairingRole::Receiver,
            status: PairingStatus::Connected,
            relays: descriptor.relays,
            created_at: now_timestamp(),
            expires_at: descriptor.expires_at,
            last_error: None,
            ephemeral,
            remote_public: Some(descriptor.public_key),
            transfer_key: Some(transfer_key),
            pending: None,
        };
        Ok((session, event))
    }

    // ========================================================================
    // INITIATOR STEPS
    // ========================================================================

    /// Process the receiver's handshake and establish the transfer key.
    pub fn accept_handshake(&mut self, event: &RelayEvent) -> Result<()> {
        self.require_role(PairingRole::Initiator)?;
        self.require_status(PairingStatus::AwaitingScan)?;
        self.guard_expiry()?;

        if event.kind != kind::PAIRING_HANDSHAKE {
            return Err(Error::MalformedEnvelope(format!(
                "expected handshake kind, got {}",
                event.kind
            )));
        }
        if !event.verify() {
            return Err(Error::MalformedEnvelope("bad handshake signature".into()));
        }
        let content: HandshakeContent = serde_json::from_str(&event.content)
            .map_err(|_| Error::MalformedEnvelope("handshake content is not valid JSON".into()))?;
        if content.session_id != self.id {
            return Err(Error::MalformedEnvelope("handshake for another session".into()));
        }
        if content.public_key != event.pubkey {
            return Err(Error::MalformedEnvelope(
                "handshake key does not match event author".into(),
            ));
        }

        let transfer_key = derive_conversation_key(self.ephemeral.secret(), &content.public_key)?;
        self.remote_public = Some(content.public_key);
        self.transfer_key = Some(transfer_key);
        self.status = PairingStatus::Connected;
        debug!(session = %self.id, "handshake accepted");
        Ok(())
    }

    /// Seal the private key under both layers and produce the transfer event.
    ///
    /// Moves the session to `Authenticating`; call
    /// [`mark_payload_published`](Self::mark_payload_published) once the
    /// event is on the wire.
    pub fn prepare_key_transfer(
        &mut self,
        private_key: &[u8],
        passphrase: &str,
    ) -> Result<RelayEvent> {
        self.require_role(PairingRole::Initiator)?;
        self.require_status(PairingStatus::Connected)?;
        self.guard_expiry()?;

        let transfer_key = self.transfer_key.as_ref().ok_or_else(|| {
            Error::InvalidSessionState("no transfer key established".into())
        })?;
        let remote = self.remote_public.clone().ok_or_else(|| {
            Error::InvalidSessionState("no remote device connected".into())
        })?;

        let layer1 = lock_with_passphrase(private_key, passphrase)?;
        let sealed = seal_for_transfer(&layer1, transfer_key)?;

        let event = EventDraft::addressed_to(
            self.ephemeral.public(),
            &remote,
            kind::KEY_TRANSFER,
            now_timestamp(),
            serde_json::to_string(&sealed)?,
        )
        .sign(self.ephemeral.secret())?;

        self.status = PairingStatus::Authenticating;
        Ok(event)
    }

    /// Record that the transfer payload reached the relay.
    pub fn mark_payload_published(&mut self) -> Result<()> {
        self.require_role(PairingRole::Initiator)?;
        self.require_status(PairingStatus::Authenticating)?;
        self.status = PairingStatus::Transferring;
        Ok(())
    }

    /// Process the receiver's receipt and complete the session.
    pub fn accept_ack(&mut self, event: &RelayEvent) -> Result<()> {
        self.require_role(PairingRole::Initiator)?;
        self.require_status(PairingStatus::Transferring)?;
        self.guard_expiry()?;

        if event.kind != kind::TRANSFER_ACK || !event.verify() {
            return Err(Error::MalformedEnvelope("bad receipt".into()));
        }
        if self.remote_public.as_deref() != Some(event.pubkey.as_str()) {
            return Err(Error::MalformedEnvelope("receipt from unknown device".into()));
        }
        let content: AckContent = serde_json::from_str(&event.content)
            .map_err(|_| Error::MalformedEnvelope("receipt content is not valid JSON".into()))?;
        if content.session_id != self.id {
            return Err(Error::MalformedEnvelope("receipt for another session".into()));
        }

        self.complete();
        Ok(())
    }

    // ========================================================================
    // RECEIVER STEPS
    // ========================================================================

    /// Process a key-transfer event and attempt to unlock it.
    ///
    /// On success returns the raw private key and the receipt event to
    /// publish. [`Error::WrongPassphrase`] leaves the session in
    /// `Authenticating` with the sealed key retained, so
    /// [`retry_unlock`](Self::retry_unlock) can run without another
    /// round-trip. Any other failure is terminal.
    pub fn receive_private_key(
        &mut self,
        event: &RelayEvent,
        passphrase: &str,
    ) -> Result<(Vec<u8>, RelayEvent)> {
        self.ingest_transfer(event)?;
        self.retry_unlock(passphrase)
    }

    /// Retry the passphrase unlock against the retained sealed key.
    pub fn retry_unlock(&mut self, passphrase: &str) -> Result<(Vec<u8>, RelayEvent)> {
        self.require_role(PairingRole::Receiver)?;
        self.require_status(PairingStatus::Authenticating)?;
        self.guard_expiry()?;

        let vault = self.pending.clone().ok_or_else(|| {
            Error::InvalidSessionState("no sealed key awaiting unlock".into())
        })?;

        match unlock_with_passphrase(&vault, passphrase) {
            Ok(private_key) => {
                // The unlock is deliberately slow; the session may have
                // expired while it ran. A late result must not complete
                // the session or emit a receipt.
                self.guard_expiry()?;
                let ack = self.build_ack()?;
                self.pending = None;
                self.complete();
                Ok((private_key, ack))
            }
            Err(Error::WrongPassphrase) => {
                warn!(session = %self.id, "passphrase rejected, unlock may be retried");
                self.last_error = Some(Error::WrongPassphrase);
                Err(Error::WrongPassphrase)
            }
            Err(other) => {
                self.fail(other.clone());
                Err(other)
            }
        }
    }

    /// Validate a key-transfer event and open the outer layer.
    fn ingest_transfer(&mut self, event: &RelayEvent) -> Result<()> {
        self.require_role(PairingRole::Receiver)?;
        if self.status != PairingStatus::Connected && self.status != PairingStatus::Authenticating {
            return Err(Error::InvalidSessionState(format!(
                "cannot ingest key transfer while {:?}",
                self.status
            )));
        }
        self.guard_expiry()?;

        if event.kind != kind::KEY_TRANSFER || !event.verify() {
            return Err(Error::MalformedEnvelope("bad key transfer event".into()));
        }
        if self.remote_public.as_deref() != Some(event.pubkey.as_str()) {
            return Err(Error::MalformedEnvelope(
                "key transfer from unknown device".into(),
            ));
        }

        let sealed: TransferVault = serde_json::from_str(&event.content).map_err(|_| {
            self.fail(Error::TransferCorrupted);
            Error::TransferCorrupted
        })?;
        let transfer_key = self.transfer_key.as_ref().ok_or_else(|| {
            Error::InvalidSessionState("no transfer key established".into())
        })?;

        match open_from_transfer(&sealed, transfer_key) {
            Ok(vault) => {
                self.pending = Some(vault);
                self.status = PairingStatus::Authenticating;
                Ok(())
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn build_ack(&self) -> Result<RelayEvent> {
        let remote = self.remote_public.clone().ok_or_else(|| {
            Error::InvalidSessionState("no remote device connected".into())
        })?;
        EventDraft::addressed_to(
            self.ephemeral.public(),
            &remote,
            kind::TRANSFER_ACK,
            now_timestamp(),
            serde_json::to_string(&AckContent {
                session_id: self.id.clone(),
            })?,
        )
        .sign(self.ephemeral.secret())
    }

    // ========================================================================
    // ASYNC DRIVERS
    // ========================================================================

    /// Initiator: wait for a handshake addressed to this session.
    pub async fn await_handshake(&mut self, relay: &dyn RelayCoordinator) -> Result<()> {
        self.require_role(PairingRole::Initiator)?;
        self.require_status(PairingStatus::AwaitingScan)?;
        let filter = Filter::new()
            .kinds([kind::PAIRING_HANDSHAKE])
            .recipient(self.ephemeral.public());
        let mut stream = relay.subscribe(filter).await?;

        let step = timeout(Duration::from_secs(STEP_TIMEOUT_SECS), async {
            while let Some(event) = stream.next().await {
                match self.accept_handshake(&event) {
                    Ok(()) => return Ok(()),
                    Err(Error::MalformedEnvelope(reason)) => {
                        warn!(session = %self.id, %reason, "skipping handshake event");
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(Error::TransportFailure("subscription closed".into()))
        })
        .await;

        match step {
            Ok(result) => result,
            Err(_) => {
                self.expire();
                Err(Error::SessionExpired)
            }
        }
    }

    /// Initiator: seal the key, publish it, and wait for the receipt.
    pub async fn send_private_key(
        &mut self,
        relay: &dyn RelayCoordinator,
        private_key: &[u8],
        passphrase: &str,
    ) -> Result<()> {
        // Subscribe before publishing so the receipt cannot slip past.
        let filter = Filter::new()
            .kinds([kind::TRANSFER_ACK])
            .recipient(self.ephemeral.public());
        let mut stream = relay.subscribe(filter).await?;

        let transfer = self.prepare_key_transfer(private_key, passphrase)?;
        relay.publish(transfer).await?;
        self.mark_payload_published()?;

        let step = timeout(Duration::from_secs(STEP_TIMEOUT_SECS), async {
            while let Some(event) = stream.next().await {
                match self.accept_ack(&event) {
                    Ok(()) => return Ok(()),
                    Err(Error::MalformedEnvelope(reason)) => {
                        warn!(session = %self.id, %reason, "skipping receipt event");
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(Error::TransportFailure("subscription closed".into()))
        })
        .await;

        match step {
            Ok(result) => result,
            Err(_) => {
                self.expire();
                Err(Error::SessionExpired)
            }
        }
    }

    /// Receiver: wait for the sealed key, unlock it, and publish the receipt.
    ///
    /// After [`Error::WrongPassphrase`] the sealed key is retained; calling
    /// this again with a new passphrase retries the unlock locally.
    pub async fn await_key_transfer(
        &mut self,
        relay: &dyn RelayCoordinator,
        passphrase: &str,
    ) -> Result<Vec<u8>> {
        self.require_role(PairingRole::Receiver)?;
        if self.status != PairingStatus::Connected && self.status != PairingStatus::Authenticating {
            return Err(Error::InvalidSessionState(format!(
                "cannot receive a key while {:?}",
                self.status
            )));
        }
        if self.pending.is_some() {
            let (private_key, ack) = self.retry_unlock(passphrase)?;
            relay.publish(ack).await?;
            return Ok(private_key);
        }

        let filter = Filter::new()
            .kinds([kind::KEY_TRANSFER])
            .recipient(self.ephemeral.public());
        let mut stream = relay.subscribe(filter).await?;

        let step = timeout(Duration::from_secs(STEP_TIMEOUT_SECS), async {
            while let Some(event) = stream.next().await {
                match self.receive_private_key(&event, passphrase) {
                    Ok(ok) => return Ok(ok),
                    Err(Error::MalformedEnvelope(reason)) => {
                        warn!(session = %self.id, %reason, "skipping key transfer event");
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(Error::TransportFailure("subscription closed".into()))
        })
        .await;

        match step {
            Ok(Ok((private_key, ack))) => {
                relay.publish(ack).await?;
                Ok(private_key)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                self.expire();
                Err(Error::SessionExpired)
            }
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Fingerprint for out-of-band comparison. Available once both ephemeral
    /// keys are known.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let remote = self.remote_public.as_deref().ok_or_else(|| {
            Error::InvalidSessionState("no remote device connected".into())
        })?;
        Ok(derive_fingerprint(&self.id, self.ephemeral.public(), remote))
    }

    /// The user compared fingerprints out-of-band and they differ. Hard abort.
    pub fn report_fingerprint_mismatch(&mut self) {
        self.fail(Error::VerificationFailed);
    }

    /// Abort the session at the user's request.
    pub fn cancel(&mut self) {
        if !self.status.is_terminal() {
            self.fail(Error::Cancelled);
        }
    }

    /// Expire the session if `now` has passed its deadline.
    pub fn check_expiry(&mut self, now: i64) -> bool {
        if !self.status.is_terminal() && now >= self.expires_at {
            self.expire();
            return true;
        }
        false
    }

    fn expire(&mut self) {
        debug!(session = %self.id, "session expired");
        self.status = PairingStatus::Expired;
        self.last_error = Some(Error::SessionExpired);
        self.scrub();
    }

    fn fail(&mut self, err: Error) {
        debug!(session = %self.id, error = %err, "session failed");
        self.status = PairingStatus::Failed;
        self.last_error = Some(err);
        self.scrub();
    }

    fn complete(&mut self) {
        debug!(session = %self.id, "session completed");
        self.status = PairingStatus::Completed;
        self.scrub();
    }

    /// Wipe all session key material. The cached ephemeral public key is
    /// kept so the fingerprint stays displayable after completion.
    fn scrub(&mut self) {
        if let Some(mut key) = self.transfer_key.take() {
            key.zeroize();
        }
        self.pending = None;
        self.ephemeral.wipe_secret();
    }

    fn require_role(&self, role: PairingRole) -> Result<()> {
        if self.role != role {
            return Err(Error::InvalidSessionState(format!(
                "operation requires the {:?} role",
                role
            )));
        }
        Ok(())
    }

    fn require_status(&self, status: PairingStatus) -> Result<()> {
        if self.status != status {
            return Err(Error::InvalidSessionState(format!(
                "expected {:?}, session is {:?}",
                status, self.status
            )));
        }
        Ok(())
    }

    fn guard_expiry(&mut self) -> Result<()> {
        if self.check_expiry(now_timestamp()) {
            return Err(Error::SessionExpired);
        }
        if self.status == PairingStatus::Expired {
            return Err(Error::SessionExpired);
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
