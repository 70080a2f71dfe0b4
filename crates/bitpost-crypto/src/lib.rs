//! Cryptographic primitives for the bitpost dispatch engine.
//!
//! This crate is the **sole** location for all cryptographic operations.
//! No other crate in the workspace may perform raw crypto directly.
//!
//! # Modules
//!
//! - [`signing`] — secp256k1 ECDSA keypair generation, signing, and
//!   verification over serializer-built payloads
//! - [`hash`] — SHA-512 hashing and the 20-byte key digest used for
//!   address derivation

pub mod hash;
pub mod signing;
