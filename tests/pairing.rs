//! Device pairing end to end: both sides driven concurrently over an
//! in-process relay, plus the failure paths a user can actually hit.

use tokio::time::{sleep, Duration};
use veil_core::pairing::{PairingSession, PairingStatus};
use veil_core::time::now_timestamp;
use veil_core::{Error, MemoryRelay, RelayCoordinator, TransferDescriptor};

fn relays() -> Vec<String> {
    vec!["wss://relay.example.com".to_string()]
}

#[tokio::test]
async fn test_full_pairing_over_relay() {
    let relay = MemoryRelay::new();
    let private_key = [0x5au8; 32];

    let (mut initiator, descriptor) =
        PairingSession::initiate(relays(), Some("Old Phone".into()));
    let uri = descriptor.encode().unwrap();

    let (mut receiver, handshake) = PairingSession::scan(&uri).unwrap();

    let initiator_side = async {
        initiator.await_handshake(&relay).await.unwrap();
        initiator
            .send_private_key(&relay, &private_key, "correct horse")
            .await
            .unwrap();
    };
    let receiver_side = async {
        // Let the initiator establish its subscription first
        sleep(Duration::from_millis(20)).await;
        relay.publish(handshake).await.unwrap();
        receiver
            .await_key_transfer(&relay, "correct horse")
            .await
            .unwrap()
    };

    let ((), recovered) = tokio::join!(initiator_side, receiver_side);

    assert_eq!(recovered, private_key);
    assert_eq!(initiator.status, PairingStatus::Completed);
    assert_eq!(receiver.status, PairingStatus::Completed);

    // Both screens would have shown the same symbols
    assert_eq!(
        initiator.fingerprint().unwrap(),
        receiver.fingerprint().unwrap()
    );
}

#[tokio::test]
async fn test_wrong_passphrase_retries_without_resend() {
    let relay = MemoryRelay::new();
    let private_key = [0x42u8; 32];

    let (mut initiator, descriptor) = PairingSession::initiate(relays(), None);
    let (mut receiver, handshake) = PairingSession::scan(&descriptor.encode().unwrap()).unwrap();
    initiator.accept_handshake(&handshake).unwrap();

    let transfer = initiator
        .prepare_key_transfer(&private_key, "correct horse")
        .unwrap();
    initiator.mark_payload_published().unwrap();

    // Mistyped passphrase: recoverable, session stays live
    let err = receiver
        .receive_private_key(&transfer, "correct h0rse")
        .unwrap_err();
    assert_eq!(err, Error::WrongPassphrase);
    assert!(err.is_recoverable());
    assert_eq!(receiver.status, PairingStatus::Authenticating);

    // Retry uses the retained sealed key; nothing is re-requested
    let recovered = receiver
        .await_key_transfer(&relay, "correct horse")
        .await
        .unwrap();
    assert_eq!(recovered, private_key);
    assert_eq!(receiver.status, PairingStatus::Completed);
}

#[test]
fn test_expired_descriptor_transfers_nothing() {
    let (initiator, mut descriptor) = PairingSession::initiate(relays(), None);
    descriptor.expires_at = now_timestamp() - 1;

    assert!(matches!(
        PairingSession::scan(&descriptor.encode().unwrap()),
        Err(Error::SessionExpired)
    ));
    // The initiator never saw a handshake and holds no transfer key
    assert_eq!(initiator.status, PairingStatus::AwaitingScan);
}

#[test]
fn test_descriptor_survives_qr_round_trip() {
    let (_, descriptor) = PairingSession::initiate(relays(), Some("Laptop".into()));
    let uri = descriptor.encode().unwrap();

    let decoded = TransferDescriptor::decode(&uri).unwrap();
    assert_eq!(decoded, descriptor);
    assert_eq!(decoded.device_name.as_deref(), Some("Laptop"));
}

#[tokio::test]
async fn test_fingerprint_mismatch_aborts_before_transfer() {
    let relay = MemoryRelay::new();
    let (mut initiator, descriptor) = PairingSession::initiate(relays(), None);
    let (mut receiver, handshake) = PairingSession::scan(&descriptor.encode().unwrap()).unwrap();
    initiator.accept_handshake(&handshake).unwrap();

    // The user compared screens and the symbols differ
    receiver.report_fingerprint_mismatch();
    assert_eq!(receiver.status, PairingStatus::Failed);
    assert_eq!(receiver.last_error, Some(Error::VerificationFailed));

    // No further steps are possible on the aborted side
    assert!(matches!(
        receiver.await_key_transfer(&relay, "any").await,
        Err(Error::InvalidSessionState(_))
    ));
}
