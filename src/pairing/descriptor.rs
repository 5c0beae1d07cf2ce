//! # Transfer Descriptor
//!
//! The out-of-band bootstrap for device pairing. The initiating device
//! renders this as a QR code (or copyable link); the receiving device scans
//! it to learn the session id, the initiator's ephemeral public key, and
//! where to rendezvous.
//!
//! Wire form: `veil://transfer?data=<base64url JSON>` with no padding, so
//! the URI survives copy-paste and QR encoders untouched.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current descriptor format version.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Descriptor type discriminator.
pub const DESCRIPTOR_TYPE: &str = "device-transfer";

/// URI scheme prefix for transfer descriptors.
pub const TRANSFER_URI_PREFIX: &str = "veil://transfer?data=";

/// Everything a receiving device needs to join a pairing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferDescriptor {
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: String,
    /// Random 32-byte session identifier, hex
    pub session_id: String,
    /// Initiator's ephemeral public key, hex x-only
    pub public_key: String,
    /// Relay URLs where the session rendezvous happens
    pub relays: Vec<String>,
    /// Unix timestamp after which the descriptor must be refused
    pub expires_at: i64,
    /// Optional human-readable name of the initiating device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl TransferDescriptor {
    /// Encode as a scannable URI.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!(
            "{}{}",
            TRANSFER_URI_PREFIX,
            URL_SAFE_NO_PAD.encode(json)
        ))
    }

    /// Decode and validate a scanned URI.
    ///
    /// Expiry is deliberately not checked here; the session layer checks it
    /// against its own clock so the error surfaces as [`Error::SessionExpired`].
    pub fn decode(uri: &str) -> Result<Self> {
        let data = uri
            .strip_prefix(TRANSFER_URI_PREFIX)
            .ok_or_else(|| Error::InvalidDescriptor("unrecognized URI scheme".into()))?;

        let json = URL_SAFE_NO_PAD
            .decode(data)
            .map_err(|_| Error::InvalidDescriptor("payload is not valid base64url".into()))?;
        let descriptor: Self = serde_json::from_slice(&json)
            .map_err(|e| Error::InvalidDescriptor(format!("payload is not valid JSON: {}", e)))?;

        if descriptor.version != DESCRIPTOR_VERSION {
            return Err(Error::VersionMismatch {
                expected: DESCRIPTOR_VERSION,
                found: descriptor.version,
            });
        }
        if descriptor.kind != DESCRIPTOR_TYPE {
            return Err(Error::InvalidDescriptor(format!(
                "unknown descriptor type '{}'",
                descriptor.kind
            )));
        }
        if descriptor.public_key.is_empty() {
            return Err(Error::InvalidDescriptor("missing public key".into()));
        }

        Ok(descriptor)
    }

    /// Whether the descriptor has expired as of `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferDescriptor {
        TransferDescriptor {
            version: DESCRIPTOR_VERSION,
            kind: DESCRIPTOR_TYPE.to_string(),
            session_id: "ab".repeat(32),
            public_key: "cd".repeat(32),
            relays: vec!["wss://relay.example.com".to_string()],
            expires_at: 1700000300,
            device_name: Some("Laptop".to_string()),
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let descriptor = sample();
        let uri = descriptor.encode().unwrap();

        assert!(uri.starts_with(TRANSFER_URI_PREFIX));
        assert_eq!(TransferDescriptor::decode(&uri).unwrap(), descriptor);
    }

    #[test]
    fn test_uri_payload_is_padding_free() {
        let uri = sample().encode().unwrap();
        let payload = uri.strip_prefix(TRANSFER_URI_PREFIX).unwrap();
        assert!(
            !payload.contains('=') && !payload.contains('+') && !payload.contains('/'),
            "payload must use the unpadded base64url alphabet"
        );
    }

    #[test]
    fn test_wrong_scheme_is_rejected() {
        assert!(matches!(
            TransferDescriptor::decode("https://example.com/?data=abc"),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        let uri = format!("{}%%%not-base64%%%", TRANSFER_URI_PREFIX);
        assert!(matches!(
            TransferDescriptor::decode(&uri),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut descriptor = sample();
        descriptor.version = 2;
        let uri = descriptor.encode().unwrap();

        assert_eq!(
            TransferDescriptor::decode(&uri),
            Err(Error::VersionMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut descriptor = sample();
        descriptor.kind = "account-export".to_string();
        let uri = descriptor.encode().unwrap();

        assert!(matches!(
            TransferDescriptor::decode(&uri),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_expiry_boundary() {
        let descriptor = sample();
        assert!(!descriptor.is_expired(descriptor.expires_at - 1));
        assert!(descriptor.is_expired(descriptor.expires_at));
    }

    #[test]
    fn test_device_name_is_optional_on_the_wire() {
        let mut descriptor = sample();
        descriptor.device_name = None;
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(!json.contains("deviceName"));

        let uri = descriptor.encode().unwrap();
        assert_eq!(TransferDescriptor::decode(&uri).unwrap(), descriptor);
    }
}
