//! Signature-payload construction.
//!
//! Builds the exact byte sequence that is signed by the sender and
//! reconstructed by every verifying peer. The layouts here are a
//! wire-compatibility contract: a single byte of drift makes every
//! signature this client produces unverifiable on the network.
//!
//! # Pubkey payload
//!
//! ```text
//! expiration_time   8B big-endian
//! object_type       4B big-endian
//! object_version    varint
//! stream_number     varint
//! address_tag       32B            (only when object_version >= 4)
//! behaviour         4B big-endian
//! signing key       64B            (0x04 marker stripped)
//! encryption key    64B            (0x04 marker stripped)
//! nonce_trials      varint
//! extra_bytes       varint
//! ```
//!
//! # Unencrypted-message payload
//!
//! ```text
//! expiration_time   8B big-endian
//! object_type       4B big-endian
//! object_version    varint
//! stream_number     varint
//! sender_addr_ver   varint
//! sender_stream     varint
//! behaviour         4B big-endian
//! signing key       64B            (0x04 marker stripped)
//! encryption key    64B            (0x04 marker stripped)
//! nonce_trials      varint         (only when sender_addr_ver >= 3)
//! extra_bytes       varint         (only when sender_addr_ver >= 3)
//! destination ripe  20B            (left-padded with zero bytes)
//! encoding          varint
//! message length    varint
//! message           raw bytes
//! ack length        varint
//! ack               raw bytes
//! ```

use bitpost_crypto::hash::RIPE_LEN;
use bitpost_crypto::signing::{UNCOMPRESSED_KEY_LEN, UNCOMPRESSED_POINT_MARKER};
use bitpost_types::{BitpostError, Result};

use crate::address::tag_for_keys;
use crate::objects::{
    PubkeyObject, UnencryptedMsg, POW_FIELDS_MIN_ADDRESS_VERSION, TAGGED_PUBKEY_MIN_VERSION,
};
use crate::varint;

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// Builds the payload to sign or verify for a pubkey object.
pub fn pubkey_signature_payload(pubkey: &PubkeyObject) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(192);

    out.extend_from_slice(&pubkey.expiration_time.to_be_bytes());
    out.extend_from_slice(&pubkey.object_type.to_be_bytes());
    varint::encode_into(pubkey.object_version, &mut out);
    varint::encode_into(pubkey.stream_number, &mut out);

    // Version 4 and above bind the payload to the address tag, which
    // must be re-derived from the keys rather than read from storage.
    if pubkey.object_version >= TAGGED_PUBKEY_MIN_VERSION {
        let tag = tag_for_keys(
            pubkey.object_version,
            pubkey.stream_number,
            &pubkey.public_signing_key,
            &pubkey.public_encryption_key,
        );
        out.extend_from_slice(&tag);
    }

    out.extend_from_slice(&pubkey.behaviour_bitfield.to_be_bytes());
    out.extend_from_slice(strip_format_marker(&pubkey.public_signing_key));
    out.extend_from_slice(strip_format_marker(&pubkey.public_encryption_key));
    varint::encode_into(pubkey.nonce_trials_per_byte, &mut out);
    varint::encode_into(pubkey.extra_bytes, &mut out);

    Ok(out)
}

/// Builds the payload to sign or verify for an unencrypted message.
///
/// # Errors
///
/// [`BitpostError::Protocol`] if the destination ripe exceeds
/// [`RIPE_LEN`] bytes — that is corrupt input, not padding material.
pub fn msg_signature_payload(msg: &UnencryptedMsg) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256 + msg.message.len() + msg.ack_data.len());

    out.extend_from_slice(&msg.expiration_time.to_be_bytes());
    out.extend_from_slice(&msg.object_type.to_be_bytes());
    varint::encode_into(msg.object_version, &mut out);
    varint::encode_into(msg.stream_number, &mut out);
    varint::encode_into(msg.sender_address_version, &mut out);
    varint::encode_into(msg.sender_stream_number, &mut out);
    out.extend_from_slice(&msg.behaviour_bitfield.to_be_bytes());
    out.extend_from_slice(strip_format_marker(&msg.public_signing_key));
    out.extend_from_slice(strip_format_marker(&msg.public_encryption_key));

    // The proof-of-work parameters only entered the payload with
    // address version 3.
    if msg.sender_address_version >= POW_FIELDS_MIN_ADDRESS_VERSION {
        varint::encode_into(msg.nonce_trials_per_byte, &mut out);
        varint::encode_into(msg.extra_bytes, &mut out);
    }

    out.extend_from_slice(&pad_ripe(&msg.destination_ripe)?);

    varint::encode_into(msg.encoding, &mut out);
    varint::encode_into(msg.message.len() as u64, &mut out);
    out.extend_from_slice(&msg.message);
    varint::encode_into(msg.ack_data.len() as u64, &mut out);
    out.extend_from_slice(&msg.ack_data);

    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strips the SEC1 uncompressed-point marker from a public key.
///
/// If the key is exactly 65 bytes and begins with `0x04`, the marker
/// byte is dropped and the raw 64-byte point returned; any other input
/// is passed through unchanged. Evaluated independently per key.
pub fn strip_format_marker(key: &[u8]) -> &[u8] {
    if key.len() == UNCOMPRESSED_KEY_LEN && key[0] == UNCOMPRESSED_POINT_MARKER {
        &key[1..]
    } else {
        key
    }
}

/// Left-pads a ripe digest with zero bytes to exactly [`RIPE_LEN`].
fn pad_ripe(ripe: &[u8]) -> Result<[u8; RIPE_LEN]> {
    if ripe.len() > RIPE_LEN {
        return Err(BitpostError::Protocol {
            reason: format!(
                "destination ripe too long: expected at most {RIPE_LEN} bytes, got {}",
                ripe.len()
            ),
        });
    }
    let mut out = [0u8; RIPE_LEN];
    out[RIPE_LEN - ripe.len()..].copy_from_slice(ripe);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
