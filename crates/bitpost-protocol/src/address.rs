//! Address derivation: ripe digest and address tag.
//!
//! An address is identified on the wire by a 20-byte digest of its two
//! public keys (the "ripe"). Pubkey objects of version 4 and above
//! additionally carry a 32-byte address tag, re-derived canonically
//! from the version, stream and key pair, so that peers can look up a
//! pubkey without learning the keys themselves.

use bitpost_crypto::hash::{double_sha512, ripe_digest, RIPE_LEN};

use crate::sigpayload::strip_format_marker;
use crate::varint;

/// Length of the address tag in bytes.
pub const TAG_LEN: usize = 32;

/// Derives the 20-byte ripe digest for a key pair.
///
/// Both keys are stripped of their `0x04` uncompressed marker (if
/// present) before hashing, so that marker-bearing and pre-stripped
/// inputs derive the same address.
pub fn derive_ripe(public_signing_key: &[u8], public_encryption_key: &[u8]) -> [u8; RIPE_LEN] {
    let mut data =
        Vec::with_capacity(public_signing_key.len() + public_encryption_key.len());
    data.extend_from_slice(strip_format_marker(public_signing_key));
    data.extend_from_slice(strip_format_marker(public_encryption_key));
    ripe_digest(&data)
}

/// Computes the address tag for a version/stream/ripe triple.
///
/// Defined as the trailing [`TAG_LEN`] bytes of
/// `SHA-512(SHA-512(varint(version) ‖ varint(stream) ‖ ripe))`.
pub fn address_tag(version: u64, stream: u64, ripe: &[u8; RIPE_LEN]) -> [u8; TAG_LEN] {
    let mut data = Vec::with_capacity(RIPE_LEN + 4);
    varint::encode_into(version, &mut data);
    varint::encode_into(stream, &mut data);
    data.extend_from_slice(ripe);

    let digest = double_sha512(&data);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest[digest.len() - TAG_LEN..]);
    tag
}

/// Re-derives the address tag directly from a key pair.
///
/// Convenience for the pubkey signature payload, which must recompute
/// the tag rather than trust a stored copy.
pub fn tag_for_keys(
    version: u64,
    stream: u64,
    public_signing_key: &[u8],
    public_encryption_key: &[u8],
) -> [u8; TAG_LEN] {
    let ripe = derive_ripe(public_signing_key, public_encryption_key);
    address_tag(version, stream, &ripe)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
