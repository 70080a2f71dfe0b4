//! The durable task queue.
//!
//! A [`QueueRecord`] describes one pending unit of work: what to do,
//! which domain objects it concerns, when it next becomes eligible,
//! and how many passes it has survived. Records are created by
//! whatever initiates an action (a user request, or a handler
//! scheduling its own follow-up), mutated by the dispatcher, and
//! destroyed on success, on exhausting the attempt budget, or when the
//! referenced object no longer exists.
//!
//! # Thread safety
//!
//! All mutations are protected by `std::sync::Mutex` and persisted to
//! disk before returning, so the queue survives a kill at any point.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use bitpost_types::{BitpostError, ObjectId, RecordId, Result, TaskKind};

use crate::store_file;

// ---------------------------------------------------------------------------
// QueueRecord
// ---------------------------------------------------------------------------

/// One pending or scheduled unit of work.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Storage identity. Assigned by [`QueueStore::insert`].
    pub id: RecordId,
    /// What kind of work this record drives.
    pub task: TaskKind,
    /// Unix seconds before which the record must not be processed.
    /// `0` means due immediately.
    pub trigger_time: u64,
    /// Ordinal of this attempt: 0 = first attempt, 1 = first retry.
    pub record_count: u32,
    /// Total processing passes this record has survived. Used only for
    /// eviction; distinct from `record_count`.
    pub attempts: u32,
    /// Unix seconds of the last pass that touched this record. Drives
    /// the fairness ordering.
    pub last_attempt_time: u64,
    /// First referenced domain object (e.g. a message id).
    pub object_0: Option<ObjectId>,
    /// Second referenced domain object (e.g. a destination pubkey id).
    pub object_1: Option<ObjectId>,
}

impl QueueRecord {
    /// Returns true when the record is eligible for processing at `now`.
    pub fn is_due(&self, now: u64) -> bool {
        self.trigger_time <= now
    }
}

// Records representing longer-waiting or earlier-due work sort first.
// This ordering is the queue's sole fairness mechanism — there is no
// priority field.
impl Ord for QueueRecord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.last_attempt_time
            .cmp(&other.last_attempt_time)
            .then(self.trigger_time.cmp(&other.trigger_time))
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueRecord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// File contents
// ---------------------------------------------------------------------------

/// On-disk representation of the queue.
///
/// `next_id` is persisted so record ids are never reused within one
/// store file, even after the highest record is deleted.
#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
    next_id: u64,
    records: Vec<QueueRecord>,
}

// ---------------------------------------------------------------------------
// QueueStore
// ---------------------------------------------------------------------------

/// Thread-safe queue-record store with file persistence.
pub struct QueueStore {
    inner: Mutex<QueueFile>,
    file_path: PathBuf,
}

impl QueueStore {
    /// Opens or creates a queue store backed by a file.
    pub fn open(path: &Path) -> Result<Self> {
        let contents: QueueFile = store_file::load_or_default(path)?;
        Ok(Self {
            inner: Mutex::new(contents),
            file_path: path.to_path_buf(),
        })
    }

    /// Inserts a new record, assigning and returning its id.
    pub fn insert(
        &self,
        task: TaskKind,
        trigger_time: u64,
        record_count: u32,
        object_0: Option<ObjectId>,
        object_1: Option<ObjectId>,
    ) -> Result<QueueRecord> {
        let mut inner = self.lock()?;

        let record = QueueRecord {
            id: RecordId::new(inner.next_id),
            task,
            trigger_time,
            record_count,
            attempts: 0,
            last_attempt_time: 0,
            object_0,
            object_1,
        };
        inner.next_id += 1;
        inner.records.push(record.clone());

        self.persist(&inner)?;
        Ok(record)
    }

    /// Returns all records, in storage order.
    pub fn all_records(&self) -> Result<Vec<QueueRecord>> {
        let inner = self.lock()?;
        Ok(inner.records.clone())
    }

    /// Returns the record with the given id, if it still exists.
    pub fn get(&self, id: RecordId) -> Result<Option<QueueRecord>> {
        let inner = self.lock()?;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    /// Returns all records whose `object_0` matches `id`.
    ///
    /// Several records may reference the same object at once (a "send
    /// now" record and its "resend if unacknowledged" follow-up), so
    /// this always returns a list.
    pub fn records_for_object(&self, id: ObjectId) -> Result<Vec<QueueRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.object_0 == Some(id))
            .cloned()
            .collect())
    }

    /// Replaces the stored record with the same id.
    pub fn update(&self, record: &QueueRecord) -> Result<()> {
        let mut inner = self.lock()?;

        let slot = inner
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| BitpostError::Storage {
                reason: format!("queue record {} not found for update", record.id),
            })?;
        *slot = record.clone();

        self.persist(&inner)
    }

    /// Deletes a record by id. Deleting an already-absent record is
    /// not an error — eviction and success paths may race with a user
    /// clearing the queue.
    pub fn remove(&self, id: RecordId) -> Result<()> {
        let mut inner = self.lock()?;
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        if inner.records.len() == before {
            return Ok(());
        }
        self.persist(&inner)
    }

    /// Returns the number of stored records.
    pub fn count(&self) -> Result<usize> {
        let inner = self.lock()?;
        Ok(inner.records.len())
    }

    // -- Internal ---------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, QueueFile>> {
        self.inner.lock().map_err(|e| BitpostError::Storage {
            reason: format!("queue store lock poisoned: {e}"),
        })
    }

    fn persist(&self, inner: &QueueFile) -> Result<()> {
        store_file::save(&self.file_path, inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, last_attempt: u64, trigger: u64) -> QueueRecord {
        QueueRecord {
            id: RecordId::new(id),
            task: TaskKind::SendMessage,
            trigger_time: trigger,
            record_count: 0,
            attempts: 0,
            last_attempt_time: last_attempt,
            object_0: Some(ObjectId::new(1)),
            object_1: None,
        }
    }

    #[test]
    fn ordering_prefers_longest_waiting() {
        let mut records = vec![record(1, 500, 0), record(2, 100, 0), record(3, 100, 50)];
        records.sort();
        let ids: Vec<u64> = records.iter().map(|r| r.id.value()).collect();
        // Earliest last-attempt first; trigger time breaks the tie.
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn due_check() {
        let r = record(1, 0, 100);
        assert!(!r.is_due(99));
        assert!(r.is_due(100));
        assert!(r.is_due(101));
        assert!(record(2, 0, 0).is_due(0));
    }
}
