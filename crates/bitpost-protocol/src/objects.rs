//! Signed protocol objects: pubkeys and unencrypted messages.
//!
//! These are the two object shapes whose signatures the engine
//! produces and verifies. Only the fields that enter the signature
//! payload live here; wire framing (magic, command, proof-of-work
//! nonce) belongs to the transport layer and is out of scope.

use serde::{Deserialize, Serialize};

/// Object-type identifier for a pubkey object.
pub const OBJECT_TYPE_PUBKEY: u32 = 1;

/// Object-type identifier for a message object.
pub const OBJECT_TYPE_MSG: u32 = 2;

/// First pubkey version that embeds the address tag in its signature
/// payload.
pub const TAGGED_PUBKEY_MIN_VERSION: u64 = 4;

/// First address version whose message payloads carry the
/// proof-of-work parameters of the sender.
pub const POW_FIELDS_MIN_ADDRESS_VERSION: u64 = 3;

// ---------------------------------------------------------------------------
// PubkeyObject
// ---------------------------------------------------------------------------

/// A public-key object to be signed and disseminated.
///
/// Both public keys are SEC1 points; they may carry the leading `0x04`
/// uncompressed marker or arrive pre-stripped — the serializer
/// normalizes either form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PubkeyObject {
    /// Unix time (seconds) at which the object expires on the network.
    pub expiration_time: u64,
    /// Object-type identifier ([`OBJECT_TYPE_PUBKEY`]).
    pub object_type: u32,
    /// Pubkey object version.
    pub object_version: u64,
    /// Stream number the owning address belongs to.
    pub stream_number: u64,
    /// Behavior bitfield advertised by the owning address.
    pub behaviour_bitfield: u32,
    /// Public signing key (64 or 65 bytes).
    pub public_signing_key: Vec<u8>,
    /// Public encryption key (64 or 65 bytes).
    pub public_encryption_key: Vec<u8>,
    /// Proof-of-work nonce trials per byte demanded by the owner.
    pub nonce_trials_per_byte: u64,
    /// Proof-of-work extra bytes demanded by the owner.
    pub extra_bytes: u64,
}

// ---------------------------------------------------------------------------
// UnencryptedMsg
// ---------------------------------------------------------------------------

/// A message object in its unencrypted form, as signed by the sender
/// and reconstructed by the recipient after decryption.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnencryptedMsg {
    /// Unix time (seconds) at which the object expires on the network.
    pub expiration_time: u64,
    /// Object-type identifier ([`OBJECT_TYPE_MSG`]).
    pub object_type: u32,
    /// Message object version.
    pub object_version: u64,
    /// Stream number the destination belongs to.
    pub stream_number: u64,
    /// Address version of the sender.
    pub sender_address_version: u64,
    /// Stream number of the sender.
    pub sender_stream_number: u64,
    /// Behavior bitfield advertised by the sender.
    pub behaviour_bitfield: u32,
    /// Sender's public signing key (64 or 65 bytes).
    pub public_signing_key: Vec<u8>,
    /// Sender's public encryption key (64 or 65 bytes).
    pub public_encryption_key: Vec<u8>,
    /// Proof-of-work nonce trials per byte of the sender.
    pub nonce_trials_per_byte: u64,
    /// Proof-of-work extra bytes of the sender.
    pub extra_bytes: u64,
    /// Ripe digest of the destination address. At most 20 bytes;
    /// shorter values are zero-padded by the serializer.
    pub destination_ripe: Vec<u8>,
    /// Message encoding type.
    pub encoding: u64,
    /// Raw message bytes.
    pub message: Vec<u8>,
    /// Raw acknowledgment object bytes (may be empty).
    pub ack_data: Vec<u8>,
}
