//! Outgoing message store.
//!
//! Holds the messages the user has asked to send, keyed by
//! [`ObjectId`]. The dispatcher resolves a queue record's message
//! reference here; a missing message means the user deleted it
//! concurrently and the record should be dropped. The one status
//! transition the dispatcher itself performs is marking a message
//! [`MessageStatus::SendingFailed`] when its record exhausts the
//! attempt budget.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use bitpost_types::{BitpostError, MessageStatus, ObjectId, ObjectKind, Result};

use crate::store_file;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An outgoing message as the dispatch engine sees it.
///
/// Body encryption, encoding and wire framing are controller concerns;
/// the engine only needs identity, destination and status.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Storage identity, referenced by queue records via `object_0`.
    pub id: ObjectId,
    /// Destination address string.
    pub to_address: String,
    /// Message body (plaintext; encrypted downstream).
    pub body: String,
    /// Current lifecycle status.
    pub status: MessageStatus,
}

// ---------------------------------------------------------------------------
// MessageStore
// ---------------------------------------------------------------------------

/// On-disk contents: id counter plus message list.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MessageFile {
    next_id: u64,
    messages: Vec<Message>,
}

/// Thread-safe message store with file persistence.
pub struct MessageStore {
    inner: Mutex<MessageFile>,
    file_path: PathBuf,
}

impl MessageStore {
    /// Opens or creates a message store backed by a file.
    pub fn open(path: &Path) -> Result<Self> {
        let contents: MessageFile = store_file::load_or_default(path)?;
        Ok(Self {
            inner: Mutex::new(contents),
            file_path: path.to_path_buf(),
        })
    }

    /// Inserts a new message and returns it with its assigned id.
    pub fn insert(&self, to_address: &str, body: &str) -> Result<Message> {
        let mut inner = self.lock()?;

        let message = Message {
            id: ObjectId::new(inner.next_id),
            to_address: to_address.to_string(),
            body: body.to_string(),
            status: MessageStatus::Queued,
        };
        inner.next_id += 1;
        inner.messages.push(message.clone());

        self.persist(&inner)?;
        Ok(message)
    }

    /// Resolves a message by id.
    ///
    /// # Errors
    ///
    /// [`BitpostError::ObjectNotFound`] when the message was deleted —
    /// the caller treats this as a normal abort, not a failure.
    pub fn get(&self, id: ObjectId) -> Result<Message> {
        let inner = self.lock()?;
        inner
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(BitpostError::ObjectNotFound {
                kind: ObjectKind::Message,
                id,
            })
    }

    /// Updates a message's status.
    pub fn set_status(&self, id: ObjectId, status: MessageStatus) -> Result<()> {
        let mut inner = self.lock()?;

        let message = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(BitpostError::ObjectNotFound {
                kind: ObjectKind::Message,
                id,
            })?;
        message.status = status;

        self.persist(&inner)
    }

    /// Deletes a message. Missing messages are ignored.
    pub fn remove(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.lock()?;
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != id);
        if inner.messages.len() == before {
            return Ok(());
        }
        self.persist(&inner)
    }

    // -- Internal ---------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, MessageFile>> {
        self.inner.lock().map_err(|e| BitpostError::Storage {
            reason: format!("message store lock poisoned: {e}"),
        })
    }

    fn persist(&self, inner: &MessageFile) -> Result<()> {
        store_file::save(&self.file_path, inner)
    }
}
