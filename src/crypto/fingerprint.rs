//! # Pairing Fingerprint
//!
//! A short, human-comparable symbol sequence both devices derive from the
//! session material. If a man-in-the-middle substituted either ephemeral key,
//! the two devices compute different sequences; the user comparing them
//! out-of-band is the final check of the handshake.
//!
//! Verification is human-in-the-loop by design: this module only derives the
//! sequence. A user-reported mismatch is a hard abort signal handled by the
//! pairing session, never an automatic decision.

use sha2::{Digest, Sha256};

/// Fixed 16-symbol alphabet. Chosen to be visually unambiguous at a glance.
pub const SYMBOLS: [&str; 16] = [
    "🐰", "🦊", "🐻", "🐼", "🦁", "🐸", "🦉", "🐙", "🍀", "🌙", "⭐", "🔥", "🌈", "⚡", "🍎", "🎈",
];

/// Number of symbols in a fingerprint.
pub const FINGERPRINT_LEN: usize = 4;

/// An ordered sequence of symbols for out-of-band comparison.
///
/// Used once during pairing, discarded after the user confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(pub [&'static str; FINGERPRINT_LEN]);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Derive the fingerprint for a pairing session.
///
/// The two ephemeral public keys are sorted lexicographically before hashing
/// so initiator and receiver compute identical output regardless of role.
pub fn derive_fingerprint(session_id: &str, public_a: &str, public_b: &str) -> Fingerprint {
    let (first, second) = if public_a <= public_b {
        (public_a, public_b)
    } else {
        (public_b, public_a)
    };

    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(second.as_bytes());
    hasher.update(session_id.as_bytes());
    let digest = hasher.finalize();

    let mut symbols = [""; FINGERPRINT_LEN];
    for (i, symbol) in symbols.iter_mut().enumerate() {
        *symbol = SYMBOLS[(digest[i] as usize) % SYMBOLS.len()];
    }
    Fingerprint(symbols)
}

// ============================================================================
// TESTS
// ============================================================================
