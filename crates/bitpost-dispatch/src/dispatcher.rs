//! The per-wake-up processing pass.
//!
//! One pass: load every queue record, skip the not-yet-due ones, sort
//! the rest by the fairness ordering, run the decision step on each and
//! apply it, then run periodic maintenance. Passes are strictly
//! sequential — the wake-up loop never overlaps them — and every
//! mutation is persisted as it happens, so a crash mid-pass loses at
//! most the in-flight handler call, never queue state.
//!
//! The dispatcher also carries the two user-driven entry points
//! ([`Dispatcher::request_send_message`] and
//! [`Dispatcher::request_create_identity`]), which enqueue records
//! synchronously before optionally attempting immediate execution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use bitpost_store::directory::Directory;
use bitpost_store::messages::MessageStore;
use bitpost_store::queue::{QueueRecord, QueueStore};
use bitpost_store::settings::SettingsStore;
use bitpost_types::config::DispatchConfig;
use bitpost_types::{MessageStatus, ObjectId, Result, TaskKind};

use crate::clock::Clock;
use crate::connectivity::ConnectivityProbe;
use crate::controller::TaskController;
use crate::decision::{decide, Action};
use crate::maintenance::{self, MaintenanceReport};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// The task scheduling and retry engine.
pub struct Dispatcher {
    queue: Arc<QueueStore>,
    messages: Arc<MessageStore>,
    directory: Arc<Directory>,
    settings: Arc<SettingsStore>,
    controller: Arc<dyn TaskController>,
    clock: Arc<dyn Clock>,
    connectivity: Arc<dyn ConnectivityProbe>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Creates a dispatcher over the given stores and capabilities.
    ///
    /// # Errors
    ///
    /// [`bitpost_types::BitpostError::Config`] if the configuration
    /// fails validation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<QueueStore>,
        messages: Arc<MessageStore>,
        directory: Arc<Directory>,
        settings: Arc<SettingsStore>,
        controller: Arc<dyn TaskController>,
        clock: Arc<dyn Clock>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: DispatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            queue,
            messages,
            directory,
            settings,
            controller,
            clock,
            connectivity,
            config,
        })
    }

    /// The configuration this dispatcher runs with.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // The pass
    // -----------------------------------------------------------------

    /// Runs one processing pass.
    ///
    /// Returns the maintenance report so callers (and tests) can await
    /// the detached database-cleaning task if one was spawned.
    pub async fn run_pass(&self) -> Result<MaintenanceReport> {
        let now = self.clock.now();
        let records = self.queue.all_records()?;
        info!(total = records.len(), "dispatch pass started");

        let mut due: Vec<QueueRecord> = Vec::new();
        for record in records {
            if record.is_due(now) {
                due.push(record);
            } else {
                debug!(
                    record = %record.id,
                    task = %record.task,
                    due_in_secs = record.trigger_time - now,
                    "trigger time not reached; leaving record for a later pass"
                );
            }
        }

        if due.is_empty() {
            return self.run_maintenance().await;
        }

        due.sort();

        for record in due {
            // A handler earlier in this pass may have consumed the
            // record (e.g. an acknowledgment arriving cancels its
            // resend follow-up); skip anything that is gone.
            match self.queue.get(record.id)? {
                Some(current) => self.process_record(current, now).await?,
                None => continue,
            }
        }

        self.run_maintenance().await
    }

    /// Routes one due record through the decision step.
    async fn process_record(&self, record: QueueRecord, now: u64) -> Result<()> {
        debug!(
            record = %record.id,
            task = %record.task,
            attempts = record.attempts,
            record_count = record.record_count,
            "processing due record"
        );

        let family_peers = match record.object_0 {
            Some(object_id) => self.queue.records_for_object(object_id)?,
            None => Vec::new(),
        };

        match decide(&record, &family_peers, &self.config) {
            Action::Evict => self.evict(&record),
            Action::Defer { push_by } => self.defer(record, push_by, now),
            Action::Execute { ttl } => self.execute(record, ttl, now).await,
        }
    }

    // -----------------------------------------------------------------
    // Action application
    // -----------------------------------------------------------------

    /// Deletes a record whose attempt budget is exhausted; a
    /// send-message record also marks its message permanently failed.
    fn evict(&self, record: &QueueRecord) -> Result<()> {
        warn!(
            record = %record.id,
            task = %record.task,
            attempts = record.attempts,
            "attempt budget exhausted; evicting record"
        );

        if record.task == TaskKind::SendMessage {
            if let Some(message_id) = record.object_0 {
                match self.messages.set_status(message_id, MessageStatus::SendingFailed) {
                    Ok(()) => {}
                    // The message being gone too is fine — nothing
                    // left to surface the failure on.
                    Err(e) if e.is_object_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
        }

        self.queue.remove(record.id)
    }

    /// Pushes a deferred record's trigger time forward and counts the
    /// pass against it.
    fn defer(&self, mut record: QueueRecord, push_by: u64, now: u64) -> Result<()> {
        debug!(
            record = %record.id,
            push_by_secs = push_by,
            "an earlier send record covers this object; deferring"
        );
        record.trigger_time += push_by;
        record.attempts += 1;
        record.last_attempt_time = now;
        self.queue.update(&record)
    }

    /// Dispatches an executable record to its handler.
    async fn execute(&self, record: QueueRecord, ttl: u64, now: u64) -> Result<()> {
        match record.task {
            TaskKind::SendMessage => self.execute_send_message(record, ttl, now).await,
            TaskKind::ProcessOutgoingMessage => {
                self.execute_process_outgoing(record, ttl, now).await
            }
            TaskKind::DisseminateMessage => self.execute_disseminate_message(record, now).await,
            TaskKind::DisseminatePubkey => self.execute_disseminate_pubkey(record, now).await,
            TaskKind::CreateIdentity => self.execute_create_identity(record, now).await,
        }
    }

    async fn execute_send_message(&self, record: QueueRecord, ttl: u64, now: u64) -> Result<()> {
        if !self.connectivity.is_available() {
            return self.offline_skip(record, now);
        }

        let Some(message_id) = record.object_0 else {
            return self.drop_malformed(&record);
        };
        let Some(message) = self.resolve(&record, self.messages.get(message_id))? else {
            return Ok(());
        };

        // A retry must line up the next retry before it runs: if no
        // acknowledgment arrives within the TTL, the follow-up record
        // becomes due by itself, without this attempt having to
        // remember to reschedule.
        if record.record_count > 0 {
            self.queue.insert(
                TaskKind::SendMessage,
                now + self.config.subsequent_attempts_ttl_secs,
                record.record_count + 1,
                record.object_0,
                record.object_1,
            )?;
        }

        let record = self.touch(record, now)?;
        if let Err(e) = self
            .controller
            .send_message(&record, &message, self.config.do_pow, ttl, ttl)
            .await
        {
            warn!(record = %record.id, error = %e, "send-message handler failed");
        }
        Ok(())
    }

    async fn execute_process_outgoing(
        &self,
        record: QueueRecord,
        ttl: u64,
        now: u64,
    ) -> Result<()> {
        let (Some(message_id), Some(pubkey_id)) = (record.object_0, record.object_1) else {
            return self.drop_malformed(&record);
        };
        let Some(message) = self.resolve(&record, self.messages.get(message_id))? else {
            return Ok(());
        };
        let Some(pubkey) = self.resolve(&record, self.directory.pubkey(pubkey_id))? else {
            return Ok(());
        };

        let record = self.touch(record, now)?;
        if let Err(e) = self
            .controller
            .process_outgoing_message(&record, &message, &pubkey, self.config.do_pow, ttl)
            .await
        {
            warn!(record = %record.id, error = %e, "process-outgoing-message handler failed");
        }
        Ok(())
    }

    async fn execute_disseminate_message(&self, record: QueueRecord, now: u64) -> Result<()> {
        if !self.connectivity.is_available() {
            return self.offline_skip(record, now);
        }

        let (Some(payload_id), Some(pubkey_id)) = (record.object_0, record.object_1) else {
            return self.drop_malformed(&record);
        };
        let Some(payload) = self.resolve(&record, self.directory.payload(payload_id))? else {
            return Ok(());
        };
        let Some(pubkey) = self.resolve(&record, self.directory.pubkey(pubkey_id))? else {
            return Ok(());
        };

        let record = self.touch(record, now)?;
        if let Err(e) = self
            .controller
            .disseminate_message(&record, &payload, &pubkey, self.config.do_pow)
            .await
        {
            warn!(record = %record.id, error = %e, "disseminate-message handler failed");
        }
        Ok(())
    }

    async fn execute_disseminate_pubkey(&self, record: QueueRecord, now: u64) -> Result<()> {
        if !self.connectivity.is_available() {
            return self.offline_skip(record, now);
        }

        let Some(payload_id) = record.object_0 else {
            return self.drop_malformed(&record);
        };
        let Some(payload) = self.resolve(&record, self.directory.payload(payload_id))? else {
            return Ok(());
        };

        let record = self.touch(record, now)?;
        if let Err(e) = self
            .controller
            .disseminate_pubkey(&record, &payload, self.config.do_pow)
            .await
        {
            warn!(record = %record.id, error = %e, "disseminate-pubkey handler failed");
        }
        Ok(())
    }

    async fn execute_create_identity(&self, record: QueueRecord, now: u64) -> Result<()> {
        // Identity creation is attempted unconditionally whenever due:
        // most of the work (key generation, pubkey assembly) is local.
        let Some(identity_id) = record.object_0 else {
            return self.drop_malformed(&record);
        };
        let Some(identity) = self.resolve(&record, self.directory.identity(identity_id))? else {
            return Ok(());
        };

        let record = self.touch(record, now)?;
        if let Err(e) = self
            .controller
            .create_identity(&record, &identity, self.config.do_pow)
            .await
        {
            warn!(record = %record.id, error = %e, "create-identity handler failed");
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // User-driven entry points
    // -----------------------------------------------------------------

    /// Handles a user request to send a message.
    ///
    /// Durably enqueues the first attempt (due immediately) and its
    /// resend follow-up (due after the first-attempt TTL — deleted if
    /// the acknowledgment arrives first), then attempts the first send
    /// right away when connectivity is available. A message the user
    /// already deleted aborts quietly.
    pub async fn request_send_message(&self, message_id: ObjectId) -> Result<()> {
        let message = match self.messages.get(message_id) {
            Ok(m) => m,
            Err(e) if e.is_object_not_found() => {
                info!(message = %message_id, "message deleted before sending; aborting request");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let now = self.clock.now();
        let record = self
            .queue
            .insert(TaskKind::SendMessage, 0, 0, Some(message_id), None)?;
        self.queue.insert(
            TaskKind::SendMessage,
            now + self.config.first_attempt_ttl_secs,
            1,
            Some(message_id),
            None,
        )?;

        if self.connectivity.is_available() {
            let ttl = self.config.first_attempt_ttl_secs;
            if let Err(e) = self
                .controller
                .send_message(&record, &message, self.config.do_pow, ttl, ttl)
                .await
            {
                warn!(record = %record.id, error = %e, "immediate send attempt failed");
            }
        }
        Ok(())
    }

    /// Handles a user request to create a new identity.
    ///
    /// Durably enqueues the task, then attempts it immediately — no
    /// connectivity precheck. An identity the user already deleted
    /// aborts quietly.
    pub async fn request_create_identity(&self, identity_id: ObjectId) -> Result<()> {
        let identity = match self.directory.identity(identity_id) {
            Ok(i) => i,
            Err(e) if e.is_object_not_found() => {
                info!(identity = %identity_id, "identity deleted before creation; aborting request");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let record =
            self.queue
                .insert(TaskKind::CreateIdentity, 0, 0, Some(identity_id), None)?;

        if let Err(e) = self
            .controller
            .create_identity(&record, &identity, self.config.do_pow)
            .await
        {
            warn!(record = %record.id, error = %e, "immediate identity creation failed");
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------

    async fn run_maintenance(&self) -> Result<MaintenanceReport> {
        maintenance::run_periodic_tasks(
            &self.directory,
            &self.settings,
            &self.controller,
            self.connectivity.as_ref(),
            self.clock.now(),
            &self.config,
        )
        .await
    }

    /// Leaves an offline-blocked record queued for the next pass. The
    /// fail-open policy still counts the pass against the record, so a
    /// record that can never execute is eventually evicted rather than
    /// queued forever.
    fn offline_skip(&self, record: QueueRecord, now: u64) -> Result<()> {
        debug!(
            record = %record.id,
            task = %record.task,
            "no connectivity; leaving record queued"
        );
        if self.config.count_offline_skips {
            self.touch(record, now)?;
        }
        Ok(())
    }

    /// Counts a processing pass against a record and persists it.
    fn touch(&self, mut record: QueueRecord, now: u64) -> Result<QueueRecord> {
        record.attempts += 1;
        record.last_attempt_time = now;
        self.queue.update(&record)?;
        Ok(record)
    }

    /// Unwraps a resolution result, deleting the record when the
    /// referenced object is gone (a normal abort, not an error).
    fn resolve<T>(&self, record: &QueueRecord, lookup: Result<T>) -> Result<Option<T>> {
        match lookup {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_object_not_found() => {
                info!(
                    record = %record.id,
                    task = %record.task,
                    error = %e,
                    "referenced object no longer exists; dropping record"
                );
                self.queue.remove(record.id)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// A record missing the object references its task requires cannot
    /// ever execute; delete it instead of retrying forever.
    fn drop_malformed(&self, record: &QueueRecord) -> Result<()> {
        warn!(
            record = %record.id,
            task = %record.task,
            "record is missing a required object reference; deleting"
        );
        self.queue.remove(record.id)
    }
}
