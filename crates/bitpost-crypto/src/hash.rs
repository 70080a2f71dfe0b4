//! SHA-512 hashing and the key digest used for address derivation.
//!
//! The protocol identifies a destination address by a fixed 20-byte
//! digest of its two public keys (the "ripe"), and pubkey objects of
//! version 4 and above carry a 32-byte address tag derived from a
//! double SHA-512. Both digests come from here.

use sha2::{Digest, Sha512};

/// Length of the address-identifying key digest in bytes.
pub const RIPE_LEN: usize = 20;

/// Computes the SHA-512 hash of arbitrary data.
///
/// Returns a fixed 64-byte digest. Deterministic: identical inputs
/// always produce identical outputs.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 64];
    out.copy_from_slice(&result);
    out
}

/// Computes `SHA-512(SHA-512(data))`.
pub fn double_sha512(data: &[u8]) -> [u8; 64] {
    sha512(&sha512(data))
}

/// Computes the 20-byte digest identifying an address.
///
/// Defined as the leading [`RIPE_LEN`] bytes of `SHA-512(data)`, where
/// `data` is the concatenation of the stripped signing and encryption
/// keys. Every implementation must reproduce this exactly or address
/// tags will not match across the network.
pub fn ripe_digest(data: &[u8]) -> [u8; RIPE_LEN] {
    let full = sha512(data);
    let mut out = [0u8; RIPE_LEN];
    out.copy_from_slice(&full[..RIPE_LEN]);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_known_vector() {
        // SHA-512 of the empty string, from FIPS 180-4 test vectors.
        let digest = sha512(b"");
        assert_eq!(
            hex::encode(digest),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn double_sha512_is_composed() {
        let data = b"bitpost";
        assert_eq!(double_sha512(data), sha512(&sha512(data)));
    }

    #[test]
    fn ripe_digest_is_prefix_of_sha512() {
        let data = b"some key material";
        let full = sha512(data);
        let ripe = ripe_digest(data);
        assert_eq!(ripe.len(), RIPE_LEN);
        assert_eq!(&ripe[..], &full[..RIPE_LEN]);
    }
}
