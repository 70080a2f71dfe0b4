//! Canonical protocol serialization for the bitpost dispatch engine.
//!
//! Everything a peer must reconstruct byte-for-byte to verify a
//! signature lives in this crate:
//!
//! - [`varint`] — base-128 continuation-bit integer encoding
//! - [`objects`] — the pubkey and unencrypted-message domain objects
//! - [`address`] — ripe digest and address-tag re-derivation
//! - [`sigpayload`] — the signature-payload builders (the
//!   wire-compatibility contract)

pub mod address;
pub mod objects;
pub mod sigpayload;
pub mod varint;
