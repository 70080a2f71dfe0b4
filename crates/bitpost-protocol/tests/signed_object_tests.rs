//! Integration tests: serializer-built payloads signed and verified
//! with real keys.
//!
//! These cover the path peers exercise: the sender assembles a payload
//! from its stored object, signs it, and every verifier reassembles
//! the identical bytes from the fields it received.

use bitpost_crypto::signing::{verify, Keypair};
use bitpost_protocol::objects::{
    PubkeyObject, UnencryptedMsg, OBJECT_TYPE_MSG, OBJECT_TYPE_PUBKEY,
};
use bitpost_protocol::sigpayload::{msg_signature_payload, pubkey_signature_payload};
use bitpost_types::Result;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn keypair(seed_byte: u8) -> Keypair {
    let mut seed = [0u8; 32];
    seed[31] = seed_byte;
    match Keypair::from_seed(&seed) {
        Ok(kp) => kp,
        Err(e) => panic!("seed {seed_byte} should be a valid scalar: {e}"),
    }
}

fn pubkey_object(signing: &Keypair, encryption: &Keypair, version: u64) -> PubkeyObject {
    PubkeyObject {
        expiration_time: 1_700_000_000,
        object_type: OBJECT_TYPE_PUBKEY,
        object_version: version,
        stream_number: 1,
        behaviour_bitfield: 1,
        public_signing_key: signing.public_key_uncompressed().to_vec(),
        public_encryption_key: encryption.public_key_uncompressed().to_vec(),
        nonce_trials_per_byte: 1000,
        extra_bytes: 1000,
    }
}

fn msg_object(signing: &Keypair, encryption: &Keypair) -> UnencryptedMsg {
    UnencryptedMsg {
        expiration_time: 1_700_000_000,
        object_type: OBJECT_TYPE_MSG,
        object_version: 1,
        stream_number: 1,
        sender_address_version: 4,
        sender_stream_number: 1,
        behaviour_bitfield: 1,
        public_signing_key: signing.public_key_uncompressed().to_vec(),
        public_encryption_key: encryption.public_key_uncompressed().to_vec(),
        nonce_trials_per_byte: 1000,
        extra_bytes: 1000,
        destination_ripe: vec![0xAB; 20],
        encoding: 2,
        message: b"integration test body".to_vec(),
        ack_data: b"ack object".to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn signed_pubkey_payload_verifies() -> Result<()> {
    let signing = keypair(1);
    let encryption = keypair(2);
    let pubkey = pubkey_object(&signing, &encryption, 4);

    let payload = pubkey_signature_payload(&pubkey)?;
    let signature = signing.sign(&payload)?;

    // A verifier rebuilds the payload from the object's fields and
    // checks the signature against the embedded signing key.
    let rebuilt = pubkey_signature_payload(&pubkey)?;
    assert_eq!(payload, rebuilt);
    assert!(verify(&signing.public_key_uncompressed(), &rebuilt, &signature)?);
    Ok(())
}

#[test]
fn signed_msg_payload_verifies() -> Result<()> {
    let signing = keypair(3);
    let encryption = keypair(4);
    let msg = msg_object(&signing, &encryption);

    let payload = msg_signature_payload(&msg)?;
    let signature = signing.sign(&payload)?;
    assert!(verify(&signing.public_key_uncompressed(), &payload, &signature)?);
    Ok(())
}

#[test]
fn field_drift_breaks_verification() -> Result<()> {
    let signing = keypair(3);
    let encryption = keypair(4);
    let msg = msg_object(&signing, &encryption);

    let signature = signing.sign(&msg_signature_payload(&msg)?)?;

    // Verifier sees a different expiration time: payload bytes differ,
    // signature no longer verifies.
    let mut drifted = msg.clone();
    drifted.expiration_time += 1;
    let rebuilt = msg_signature_payload(&drifted)?;
    assert!(!verify(&signing.public_key_uncompressed(), &rebuilt, &signature)?);
    Ok(())
}

#[test]
fn tampered_signature_byte_fails() -> Result<()> {
    let signing = keypair(5);
    let encryption = keypair(6);
    let pubkey = pubkey_object(&signing, &encryption, 4);

    let payload = pubkey_signature_payload(&pubkey)?;
    let signature = signing.sign(&payload)?;

    // Flip one byte inside the DER body (skip the header bytes so the
    // encoding stays parseable and we exercise the false path, not the
    // corrupt-encoding path).
    let mut tampered = signature.clone();
    let idx = tampered.len() - 1;
    tampered[idx] ^= 0x01;
    match verify(&signing.public_key_uncompressed(), &payload, &tampered) {
        Ok(valid) => assert!(!valid),
        // Flipping the last byte can also make the DER integer invalid;
        // that surfaces as the fatal-corrupt-encoding error instead.
        Err(e) => assert!(matches!(e, bitpost_types::BitpostError::Crypto { .. })),
    }
    Ok(())
}

#[test]
fn verifier_with_stripped_key_sees_same_payload() -> Result<()> {
    let signing = keypair(7);
    let encryption = keypair(8);
    let mut pubkey = pubkey_object(&signing, &encryption, 4);

    let payload_with_markers = pubkey_signature_payload(&pubkey)?;

    // A peer that stored the keys pre-stripped must derive identical
    // payload bytes.
    pubkey.public_signing_key = pubkey.public_signing_key[1..].to_vec();
    pubkey.public_encryption_key = pubkey.public_encryption_key[1..].to_vec();
    let payload_stripped = pubkey_signature_payload(&pubkey)?;

    assert_eq!(payload_with_markers, payload_stripped);
    Ok(())
}
