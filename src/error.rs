//! # Error Handling
//!
//! All fallible operations in Veil Core return [`Result`] with the single
//! [`Error`] enum below. Variants are grouped by domain, with stable numeric
//! codes for callers that cross a language boundary.
//!
//! A few variants carry usability weight and must never be conflated:
//!
//! - [`Error::WrongPassphrase`]: layer-1 vault decryption failed. The user
//!   mistyped their passphrase and may simply retry.
//! - [`Error::TransferCorrupted`]: layer-2 vault decryption failed. The
//!   transfer payload was corrupted or intercepted; the pairing must restart.
//! - [`Error::TransportFailure`]: the relay connection hiccuped. Retryable.
//!
//! Cryptographic failures are never retried with the same key material.

use thiserror::Error;

/// Result type alias for Veil Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Veil Core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Malformed key material (bad scalar, bad point, wrong length)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// AEAD tag mismatch: wrong key or tampered ciphertext.
    ///
    /// Deliberately carries no detail; all decryption failures collapse into
    /// this variant so callers cannot be used as a padding/format oracle.
    #[error("Authentication failed: ciphertext rejected")]
    AuthenticationFailed,

    /// Encryption operation failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Plaintext exceeds the largest padding bucket
    #[error("Payload of {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Key derivation failed
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Event signing failed
    #[error("Signing failed")]
    SigningFailed,

    // ========================================================================
    // Envelope / Wire Errors (400-499)
    // ========================================================================

    /// Undecodable sealed envelope; dropped silently at the protocol layer
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Incompatible transfer descriptor version
    #[error("Unsupported descriptor version {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    /// Transfer descriptor is structurally invalid
    #[error("Invalid transfer descriptor: {0}")]
    InvalidDescriptor(String),

    // ========================================================================
    // Pairing Errors (500-599)
    // ========================================================================

    /// Session-wide or per-step timeout reached; session discarded
    #[error("Pairing session expired")]
    SessionExpired,

    /// Layer-1 vault decryption failed; the user may retry the passphrase
    #[error("Wrong passphrase")]
    WrongPassphrase,

    /// Layer-2 vault decryption failed; pairing must restart
    #[error("Transfer payload corrupted")]
    TransferCorrupted,

    /// User reported a fingerprint mismatch; treated as a potential attack
    #[error("Fingerprint verification failed")]
    VerificationFailed,

    /// Session cancelled by the user
    #[error("Pairing session cancelled")]
    Cancelled,

    /// Operation not valid for the session's current status
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    // ========================================================================
    // Transport Errors (600-699)
    // ========================================================================

    /// Relay publish/subscribe failure; retried with backoff by the
    /// transport collaborator, surfaced only when retries exhaust
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Get the stable numeric code for this error
    ///
    /// Codes are grouped by domain:
    /// - 300-399: Crypto
    /// - 400-499: Envelope / wire format
    /// - 500-599: Pairing
    /// - 600-699: Transport
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Crypto (300-399)
            Error::InvalidKey(_) => 300,
            Error::AuthenticationFailed => 301,
            Error::EncryptionFailed(_) => 302,
            Error::PayloadTooLarge { .. } => 303,
            Error::KeyDerivationFailed(_) => 304,
            Error::SigningFailed => 305,

            // Envelope (400-499)
            Error::MalformedEnvelope(_) => 400,
            Error::VersionMismatch { .. } => 401,
            Error::InvalidDescriptor(_) => 402,

            // Pairing (500-599)
            Error::SessionExpired => 500,
            Error::WrongPassphrase => 501,
            Error::TransferCorrupted => 502,
            Error::VerificationFailed => 503,
            Error::Cancelled => 504,
            Error::InvalidSessionState(_) => 505,

            // Transport (600-699)
            Error::TransportFailure(_) => 600,

            // Internal (900-999)
            Error::Serialization(_) => 900,
        }
    }

    /// Check if this error is recoverable without restarting the operation
    ///
    /// A wrong passphrase allows the user to retry within the same pairing
    /// session; transport failures may be retried by the relay collaborator.
    /// Everything else is terminal for the operation it occurred in.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::WrongPassphrase | Error::TransportFailure(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_grouped_by_domain() {
        assert_eq!(Error::InvalidKey("bad".into()).code(), 300);
        assert_eq!(Error::AuthenticationFailed.code(), 301);
        assert_eq!(Error::MalformedEnvelope("x".into()).code(), 400);
        assert_eq!(Error::SessionExpired.code(), 500);
        assert_eq!(Error::TransportFailure("down".into()).code(), 600);
        assert_eq!(Error::Serialization("x".into()).code(), 900);
    }

    #[test]
    fn test_wrong_passphrase_is_recoverable() {
        assert!(Error::WrongPassphrase.is_recoverable());
        assert!(Error::TransportFailure("reset".into()).is_recoverable());
        assert!(!Error::TransferCorrupted.is_recoverable());
        assert!(!Error::AuthenticationFailed.is_recoverable());
        assert!(!Error::VerificationFailed.is_recoverable());
    }

    #[test]
    fn test_passphrase_and_corruption_are_distinct() {
        // The UI routes these to different recovery flows; they must never
        // compare equal or share a code.
        assert_ne!(Error::WrongPassphrase, Error::TransferCorrupted);
        assert_ne!(Error::WrongPassphrase.code(), Error::TransferCorrupted.code());
    }
}
