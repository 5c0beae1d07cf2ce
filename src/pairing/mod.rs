//! # Device Pairing Module
//!
//! Moves a private key from one device to another over untrusted relays.
//! The flow is bootstrapped out-of-band (a QR code), protected in transit
//! by two independent encryption layers, and verified by a human comparing
//! fingerprints on both screens.
//!
//! Entry points:
//! - [`PairingSession::initiate`] on the device that holds the key
//! - [`PairingSession::scan`] on the device that wants it
//! - [`SessionRegistry`] for hosts juggling several concurrent sessions

pub mod descriptor;
pub mod registry;
pub mod session;

pub use descriptor::{TransferDescriptor, DESCRIPTOR_VERSION, TRANSFER_URI_PREFIX};
pub use registry::SessionRegistry;
pub use session::{
    PairingRole, PairingSession, PairingStatus, SESSION_TTL_SECS, STEP_TIMEOUT_SECS,
};
