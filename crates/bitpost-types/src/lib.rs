//! Core shared types for the bitpost dispatch engine.
//!
//! This crate defines the fundamental types used across the workspace.
//! No other crate should define shared types — everything lives here.

pub mod config;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Storage identity of a queue record.
///
/// Assigned by the queue store on insert and never reused within one
/// store file. A record has no natural key beyond this id — several
/// records may reference the same domain object at once.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Creates a `RecordId` from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Opaque identifier of a domain object (message, pubkey, payload,
/// identity) referenced by a queue record.
///
/// The dispatch engine never inspects the object behind the id; it only
/// resolves it through a store and treats "not found" as a normal abort
/// condition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Creates an `ObjectId` from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// The closed set of task kinds a queue record can carry.
///
/// Dispatch is matched exhaustively on this enum — adding a variant
/// forces every dispatch site to handle it at compile time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Create a new identity and disseminate its pubkey.
    CreateIdentity,
    /// Broadcast a signed pubkey payload onto the network.
    DisseminatePubkey,
    /// Top-level "send this message" task; spawns the processing chain.
    SendMessage,
    /// Encrypt, sign and proof-of-work an outgoing message.
    ProcessOutgoingMessage,
    /// Broadcast a processed message payload onto the network.
    DisseminateMessage,
}

impl TaskKind {
    /// Returns true for the tasks that make up the "send family":
    /// tasks whose `object_0` references a message being sent. Used by
    /// the overlap/deduplication rule.
    pub fn in_send_family(&self) -> bool {
        matches!(self, Self::SendMessage | Self::ProcessOutgoingMessage)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateIdentity => write!(f, "create-identity"),
            Self::DisseminatePubkey => write!(f, "disseminate-pubkey"),
            Self::SendMessage => write!(f, "send-message"),
            Self::ProcessOutgoingMessage => write!(f, "process-outgoing-message"),
            Self::DisseminateMessage => write!(f, "disseminate-message"),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an outgoing message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Recorded locally, not yet picked up by the dispatcher.
    Queued,
    /// First send attempt is in flight.
    SendingFirstAttempt,
    /// Sent; waiting for the recipient's acknowledgment.
    AwaitingAck,
    /// Acknowledgment received; delivery confirmed.
    AckReceived,
    /// Terminal: the attempt budget was exhausted without success.
    SendingFailed,
}

impl MessageStatus {
    /// Returns true when no further dispatch work will touch the message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AckReceived | Self::SendingFailed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::SendingFirstAttempt => write!(f, "sending (first attempt)"),
            Self::AwaitingAck => write!(f, "awaiting acknowledgment"),
            Self::AckReceived => write!(f, "acknowledgment received"),
            Self::SendingFailed => write!(f, "sending failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// The kind of domain object a store lookup failed to resolve.
///
/// Carried in [`BitpostError::ObjectNotFound`] so logs can name what
/// went missing without the dispatcher inspecting store internals.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// An outgoing message.
    Message,
    /// A recipient or local pubkey.
    Pubkey,
    /// A constructed wire payload awaiting dissemination.
    Payload,
    /// A local identity (an address we own).
    Identity,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Pubkey => write!(f, "pubkey"),
            Self::Payload => write!(f, "payload"),
            Self::Identity => write!(f, "identity"),
        }
    }
}

// ---------------------------------------------------------------------------
// BitpostError
// ---------------------------------------------------------------------------

/// Central error type for the bitpost workspace.
///
/// All crates convert their internal errors into variants of this enum,
/// giving a unified error surface. `ObjectNotFound` is the one variant
/// the dispatcher treats as expected: the referenced object was deleted
/// concurrently, so the record driving it is dropped and the pass
/// continues.
#[derive(Debug, Error)]
pub enum BitpostError {
    /// A referenced domain object does not exist (concurrent deletion).
    #[error("{kind} {id} not found")]
    ObjectNotFound {
        /// What kind of object the lookup was for.
        kind: ObjectKind,
        /// The id that failed to resolve.
        id: ObjectId,
    },

    /// A storage operation failed (I/O, serialization, lock poisoning).
    #[error("storage error: {reason}")]
    Storage {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// A protocol-level failure (payload construction, varint decoding).
    #[error("protocol error: {reason}")]
    Protocol {
        /// Human-readable description of the protocol failure.
        reason: String,
    },

    /// A cryptographic primitive failed. Always a configuration or
    /// environment fault, never a recoverable condition.
    #[error("crypto error: {reason}")]
    Crypto {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A configuration value is outside its acceptable range.
    #[error("config error: {reason}")]
    Config {
        /// Human-readable description of the invalid value.
        reason: String,
    },
}

impl BitpostError {
    /// Returns true when the error is the expected "object was deleted
    /// out from under us" condition rather than a real failure.
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }
}

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, BitpostError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
