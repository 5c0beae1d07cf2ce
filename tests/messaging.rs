//! End-to-end messaging over an in-process relay: what the recipient
//! recovers, and what the relay operator is left looking at.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::StreamExt;
use veil_core::crypto::{cipher, KeyPair};
use veil_core::relay::kind;
use veil_core::seal::TIMESTAMP_JITTER_SECS;
use veil_core::time::now_timestamp;
use veil_core::{open_message, seal_message, Error, Filter, MemoryRelay, RelayCoordinator};

#[tokio::test]
async fn test_message_round_trip_over_relay() {
    let relay = MemoryRelay::new();
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    let mut inbox = relay
        .subscribe(
            Filter::new()
                .kinds([kind::SEALED_MESSAGE])
                .recipient(bob.public()),
        )
        .await
        .unwrap();

    let envelope = seal_message(&alice, bob.public(), "Hello, secure world!").unwrap();
    relay.publish(envelope).await.unwrap();

    let delivered = inbox.next().await.unwrap();
    let (sender, plaintext) = open_message(&delivered, &bob).unwrap();

    assert_eq!(sender, alice.public());
    assert_eq!(plaintext, "Hello, secure world!");
}

#[test]
fn test_relay_operator_view() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    let before = now_timestamp();
    let envelope = seal_message(&alice, bob.public(), "meet at noon").unwrap();
    let after = now_timestamp();

    // The visible author is a throwaway key, not Alice
    assert_ne!(envelope.pubkey, alice.public());
    // Routing needs the recipient tag; that much leaks
    assert_eq!(envelope.recipient(), Some(bob.public()));
    // The timestamp is jittered, never exact
    assert!(envelope.created_at >= before - TIMESTAMP_JITTER_SECS);
    assert!(envelope.created_at <= after + TIMESTAMP_JITTER_SECS);
    // The content is opaque
    assert!(!envelope.content.contains("meet at noon"));
    // And the envelope still carries a valid signature
    assert!(envelope.verify());
}

#[test]
fn test_two_messages_are_unlinkable_by_author() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    let first = seal_message(&alice, bob.public(), "one").unwrap();
    let second = seal_message(&alice, bob.public(), "two").unwrap();

    assert_ne!(first.pubkey, second.pubkey);
}

#[test]
fn test_padding_rounds_up_to_buckets() {
    let key = [7u8; 32];

    let blob_len = |n: usize| {
        BASE64
            .decode(cipher::encrypt(&vec![0u8; n], &key).unwrap())
            .unwrap()
            .len()
    };

    // 500 bytes of plaintext fits the 512 bucket with its header;
    // one more byte spills into the 1024 bucket.
    let at_500 = blob_len(500);
    let at_501 = blob_len(501);
    assert_eq!(at_501 - at_500, 1024 - 512);

    // Same bucket, same observable size
    assert_eq!(blob_len(10), blob_len(19));
}

#[test]
fn test_tampered_envelope_yields_no_plaintext() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    let envelope = seal_message(&alice, bob.public(), "integrity matters").unwrap();

    let mut bytes = BASE64.decode(&envelope.content).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;

    let mut tampered = envelope.clone();
    tampered.content = BASE64.encode(&bytes);

    assert_eq!(
        open_message(&tampered, &bob),
        Err(Error::AuthenticationFailed)
    );
    // The original still opens
    assert!(open_message(&envelope, &bob).is_ok());
}

#[test]
fn test_only_the_recipient_can_open() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();
    let relay_operator = KeyPair::generate();

    let envelope = seal_message(&alice, bob.public(), "for bob").unwrap();

    assert_eq!(
        open_message(&envelope, &relay_operator),
        Err(Error::AuthenticationFailed)
    );
}
