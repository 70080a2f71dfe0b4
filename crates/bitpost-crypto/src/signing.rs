//! secp256k1 ECDSA signature operations.
//!
//! Provides keypair generation, payload signing, and signature
//! verification. Public keys travel in SEC1 uncompressed form (65
//! bytes, leading `0x04` marker); signatures travel DER-encoded, as
//! peers on the network expect.
//!
//! Signing uses a randomized nonce per call. Verification never errors
//! for a well-formed-but-invalid signature — it returns `Ok(false)` and
//! the caller decides what to log. Malformed key material or corrupt
//! DER is a configuration fault and is reported as
//! [`BitpostError::Crypto`].

use bitpost_types::{BitpostError, Result};
use k256::ecdsa::signature::{RandomizedSigner, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

/// Length of an uncompressed SEC1 public key, marker byte included.
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// SEC1 format marker for an uncompressed curve point.
pub const UNCOMPRESSED_POINT_MARKER: u8 = 0x04;

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// secp256k1 ECDSA signing keypair.
///
/// Wraps a `k256` [`SigningKey`]. Intentionally implements neither
/// `Clone` nor `Debug`, so the private scalar cannot leak into logs or
/// accidental copies.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a new random keypair using OS-level entropy.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self { signing_key }
    }

    /// Reconstructs a keypair deterministically from a 32-byte seed.
    ///
    /// Given the same seed, this always produces the same keypair.
    /// Fails if the seed is not a valid non-zero curve scalar.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(seed).map_err(|e| BitpostError::Crypto {
            reason: format!("invalid signing key seed: {e}"),
        })?;
        Ok(Self { signing_key })
    }

    /// Returns the public key in SEC1 uncompressed form: 65 bytes,
    /// leading `0x04` marker followed by the 64-byte raw point.
    pub fn public_key_uncompressed(&self) -> [u8; UNCOMPRESSED_KEY_LEN] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let bytes = point.as_bytes();
        let mut out = [0u8; UNCOMPRESSED_KEY_LEN];
        out.copy_from_slice(bytes);
        out
    }

    /// Signs a payload, returning the DER-encoded ECDSA signature.
    ///
    /// Uses fresh randomness for the nonce on every call, so two
    /// signatures over the same payload differ while both verify. Any
    /// failure of the underlying primitive is fatal — retrying a
    /// deterministic construction cannot succeed.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self
            .signing_key
            .try_sign_with_rng(&mut OsRng, payload)
            .map_err(|e| BitpostError::Crypto {
                reason: format!("ECDSA signing failed: {e}"),
            })?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Verifies a DER-encoded ECDSA signature over a payload.
///
/// # Returns
///
/// - `Ok(true)` — the signature is valid for this key and payload.
/// - `Ok(false)` — the signature is well formed but does not verify.
///
/// # Errors
///
/// [`BitpostError::Crypto`] if `public_key` is not a valid SEC1 point
/// or `signature` is not valid DER. Those are corrupt-input faults, not
/// expected-false results.
pub fn verify(public_key: &[u8], payload: &[u8], signature: &[u8]) -> Result<bool> {
    let vk = VerifyingKey::from_sec1_bytes(public_key).map_err(|e| BitpostError::Crypto {
        reason: format!("invalid public key: {e}"),
    })?;

    let sig = Signature::from_der(signature).map_err(|e| BitpostError::Crypto {
        reason: format!("corrupt signature encoding: {e}"),
    })?;

    Ok(vk.verify(payload, &sig).is_ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
