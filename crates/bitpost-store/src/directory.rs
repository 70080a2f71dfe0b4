//! Domain-object directory: identities, pubkeys, and wire payloads.
//!
//! Thin resolve-by-id stores for everything the dispatcher references
//! besides messages. Each lookup either returns the object or
//! [`bitpost_types::BitpostError::ObjectNotFound`]; the dispatcher
//! treats the latter as "the user deleted it, drop the record".

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use bitpost_types::{BitpostError, ObjectId, ObjectKind, Result};

use crate::store_file;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A local identity: an address this client owns.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Storage identity.
    pub id: ObjectId,
    /// Address string of this identity.
    pub address: String,
    /// Unix seconds when the pubkey was last disseminated, 0 if never.
    pub last_pubkey_dissemination_time: u64,
}

/// A stored pubkey (a recipient's, or our own awaiting dissemination).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PubkeyRecord {
    /// Storage identity.
    pub id: ObjectId,
    /// Address version of the owning address.
    pub address_version: u64,
    /// Stream number of the owning address.
    pub stream_number: u64,
    /// Public signing key bytes.
    pub public_signing_key: Vec<u8>,
    /// Public encryption key bytes.
    pub public_encryption_key: Vec<u8>,
}

/// A constructed wire payload awaiting dissemination.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PayloadRecord {
    /// Storage identity.
    pub id: ObjectId,
    /// The assembled object bytes, proof-of-work included when done.
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// On-disk contents of the directory.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    next_id: u64,
    identities: Vec<Identity>,
    pubkeys: Vec<PubkeyRecord>,
    payloads: Vec<PayloadRecord>,
}

/// Thread-safe directory store with file persistence.
pub struct Directory {
    inner: Mutex<DirectoryFile>,
    file_path: PathBuf,
}

impl Directory {
    /// Opens or creates a directory store backed by a file.
    pub fn open(path: &Path) -> Result<Self> {
        let contents: DirectoryFile = store_file::load_or_default(path)?;
        Ok(Self {
            inner: Mutex::new(contents),
            file_path: path.to_path_buf(),
        })
    }

    // -- Identities -------------------------------------------------------

    /// Inserts a local identity.
    pub fn insert_identity(&self, address: &str) -> Result<Identity> {
        let mut inner = self.lock()?;
        let identity = Identity {
            id: ObjectId::new(inner.next_id),
            address: address.to_string(),
            last_pubkey_dissemination_time: 0,
        };
        inner.next_id += 1;
        inner.identities.push(identity.clone());
        self.persist(&inner)?;
        Ok(identity)
    }

    /// Resolves a local identity by id.
    pub fn identity(&self, id: ObjectId) -> Result<Identity> {
        let inner = self.lock()?;
        inner
            .identities
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(BitpostError::ObjectNotFound {
                kind: ObjectKind::Identity,
                id,
            })
    }

    /// Returns the number of local identities. The periodic checks
    /// only run when this is non-zero.
    pub fn identity_count(&self) -> Result<usize> {
        let inner = self.lock()?;
        Ok(inner.identities.len())
    }

    /// Deletes a local identity. Missing ids are ignored.
    pub fn remove_identity(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.lock()?;
        let before = inner.identities.len();
        inner.identities.retain(|i| i.id != id);
        if inner.identities.len() == before {
            return Ok(());
        }
        self.persist(&inner)
    }

    // -- Pubkeys ----------------------------------------------------------

    /// Inserts a pubkey record.
    pub fn insert_pubkey(
        &self,
        address_version: u64,
        stream_number: u64,
        public_signing_key: Vec<u8>,
        public_encryption_key: Vec<u8>,
    ) -> Result<PubkeyRecord> {
        let mut inner = self.lock()?;
        let pubkey = PubkeyRecord {
            id: ObjectId::new(inner.next_id),
            address_version,
            stream_number,
            public_signing_key,
            public_encryption_key,
        };
        inner.next_id += 1;
        inner.pubkeys.push(pubkey.clone());
        self.persist(&inner)?;
        Ok(pubkey)
    }

    /// Resolves a pubkey record by id.
    pub fn pubkey(&self, id: ObjectId) -> Result<PubkeyRecord> {
        let inner = self.lock()?;
        inner
            .pubkeys
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(BitpostError::ObjectNotFound {
                kind: ObjectKind::Pubkey,
                id,
            })
    }

    // -- Payloads ---------------------------------------------------------

    /// Inserts a payload record.
    pub fn insert_payload(&self, bytes: Vec<u8>) -> Result<PayloadRecord> {
        let mut inner = self.lock()?;
        let payload = PayloadRecord {
            id: ObjectId::new(inner.next_id),
            bytes,
        };
        inner.next_id += 1;
        inner.payloads.push(payload.clone());
        self.persist(&inner)?;
        Ok(payload)
    }

    /// Resolves a payload record by id.
    pub fn payload(&self, id: ObjectId) -> Result<PayloadRecord> {
        let inner = self.lock()?;
        inner
            .payloads
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(BitpostError::ObjectNotFound {
                kind: ObjectKind::Payload,
                id,
            })
    }

    /// Deletes a payload record. Missing ids are ignored.
    pub fn remove_payload(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.lock()?;
        let before = inner.payloads.len();
        inner.payloads.retain(|p| p.id != id);
        if inner.payloads.len() == before {
            return Ok(());
        }
        self.persist(&inner)
    }

    // -- Internal ---------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, DirectoryFile>> {
        self.inner.lock().map_err(|e| BitpostError::Storage {
            reason: format!("directory store lock poisoned: {e}"),
        })
    }

    fn persist(&self, inner: &DirectoryFile) -> Result<()> {
        store_file::save(&self.file_path, inner)
    }
}
