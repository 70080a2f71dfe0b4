//! The pure scheduling policy: execute, defer, or evict.
//!
//! Policy is separated from mutation: [`decide`] inspects a due record
//! (plus the other records referencing the same object) and returns an
//! [`Action`]; the dispatcher then applies it. Nothing in this module
//! touches a store, so the whole retry policy is testable as a plain
//! function.

use bitpost_store::queue::QueueRecord;
use bitpost_types::config::DispatchConfig;
use bitpost_types::TaskKind;

/// What the dispatcher should do with one due record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Run the task now, with this time-to-live for the objects it
    /// creates.
    Execute {
        /// TTL in seconds: the first-attempt constant on the first
        /// attempt, the subsequent-attempt constant thereafter.
        ttl: u64,
    },
    /// Skip this pass and push the trigger time forward.
    Defer {
        /// Seconds to add to the record's trigger time.
        push_by: u64,
    },
    /// The attempt budget is exhausted: delete the record (and mark a
    /// send-message's message as permanently failed).
    Evict,
}

/// Chooses the TTL for a record by attempt ordinal.
pub fn ttl_for(record: &QueueRecord, config: &DispatchConfig) -> u64 {
    if record.record_count == 0 {
        config.first_attempt_ttl_secs
    } else {
        config.subsequent_attempts_ttl_secs
    }
}

/// Decides what to do with a due record.
///
/// `family_peers` are the other records referencing the same
/// `object_0`. Only the send family consults them: if a peer send
/// record has a strictly earlier trigger time, the current record is
/// the redundant one and is deferred instead of executed — at most one
/// active send attempt per logical message proceeds in a pass.
pub fn decide(
    record: &QueueRecord,
    family_peers: &[QueueRecord],
    config: &DispatchConfig,
) -> Action {
    if record.attempts > config.maximum_attempts {
        return Action::Evict;
    }

    if record.task == TaskKind::SendMessage {
        let overlapped = family_peers.iter().any(|peer| {
            peer.id != record.id
                && peer.task.in_send_family()
                && peer.trigger_time < record.trigger_time
        });
        if overlapped {
            return Action::Defer {
                push_by: ttl_for(record, config),
            };
        }
    }

    Action::Execute {
        ttl: ttl_for(record, config),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
