//! Base-128 variable-length integer encoding.
//!
//! Each byte carries 7 data bits; the most significant bit signals
//! "more bytes follow". Small values (the common case) take one byte,
//! `u64::MAX` takes ten. This encoding appears inside every signature
//! payload and must match byte-for-byte across implementations or
//! signatures will fail to verify across the network.
//!
//! Backed by the `unsigned-varint` crate; this module only adapts its
//! API to the workspace error type.

use bitpost_types::{BitpostError, Result};

/// Encodes a value as a base-128 varint.
pub fn encode(value: u64) -> Vec<u8> {
    let mut buf = unsigned_varint::encode::u64_buffer();
    unsigned_varint::encode::u64(value, &mut buf).to_vec()
}

/// Appends the varint encoding of `value` to `out`.
pub fn encode_into(value: u64, out: &mut Vec<u8>) {
    let mut buf = unsigned_varint::encode::u64_buffer();
    out.extend_from_slice(unsigned_varint::encode::u64(value, &mut buf));
}

/// Decodes a varint from the front of `bytes`.
///
/// Returns the decoded value and the remaining suffix.
///
/// # Errors
///
/// [`BitpostError::Protocol`] if the input is truncated mid-varint or
/// does not fit in a `u64`.
pub fn decode(bytes: &[u8]) -> Result<(u64, &[u8])> {
    unsigned_varint::decode::u64(bytes).map_err(|e| BitpostError::Protocol {
        reason: format!("varint decode failed: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
