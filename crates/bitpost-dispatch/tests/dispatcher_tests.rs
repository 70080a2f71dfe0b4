//! Integration tests for the dispatch pass.
//!
//! All tests are deterministic: time comes from a manual clock,
//! connectivity from a settable flag, and handlers from a recording
//! double, so every assertion is about persisted queue state and the
//! exact sequence of handler calls.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bitpost_dispatch::clock::{Clock, ManualClock};
use bitpost_dispatch::connectivity::{ConnectivityProbe, StaticConnectivity};
use bitpost_dispatch::controller::TaskController;
use bitpost_dispatch::dispatcher::Dispatcher;
use bitpost_dispatch::testing::{CallEvent, RecordingController};
use bitpost_store::directory::Directory;
use bitpost_store::messages::MessageStore;
use bitpost_store::queue::QueueStore;
use bitpost_store::settings::SettingsStore;
use bitpost_types::config::DispatchConfig;
use bitpost_types::{MessageStatus, ObjectId, Result, TaskKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Returns a unique temporary directory for each test.
fn temp_dir() -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "bitpost-dispatch-test-{}-{}-{}",
        std::process::id(),
        id,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    ));
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// A dispatcher over fresh stores plus handles to its injected parts.
struct Harness {
    queue: Arc<QueueStore>,
    messages: Arc<MessageStore>,
    directory: Arc<Directory>,
    settings: Arc<SettingsStore>,
    controller: Arc<RecordingController>,
    clock: Arc<ManualClock>,
    connectivity: Arc<StaticConnectivity>,
    dispatcher: Dispatcher,
}

/// Builds a harness at time `now`. The last database clean is stamped
/// to `now` so cleaning stays quiet unless a test re-arms it.
fn harness(now: u64, online: bool, config: DispatchConfig) -> Result<Harness> {
    let dir = temp_dir();
    let queue = Arc::new(QueueStore::open(&dir.join("queue.dat"))?);
    let messages = Arc::new(MessageStore::open(&dir.join("messages.dat"))?);
    let directory = Arc::new(Directory::open(&dir.join("directory.dat"))?);
    let settings = Arc::new(SettingsStore::open(&dir.join("settings.dat"))?);
    settings.set_last_database_clean_time(now)?;

    let controller = Arc::new(RecordingController::new());
    let clock = Arc::new(ManualClock::at(now));
    let connectivity = Arc::new(StaticConnectivity::new(online));

    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&messages),
        Arc::clone(&directory),
        Arc::clone(&settings),
        Arc::clone(&controller) as Arc<dyn TaskController>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&connectivity) as Arc<dyn ConnectivityProbe>,
        config,
    )?;

    Ok(Harness {
        queue,
        messages,
        directory,
        settings,
        controller,
        clock,
        connectivity,
        dispatcher,
    })
}

fn send_calls(harness: &Harness) -> usize {
    harness
        .controller
        .calls()
        .iter()
        .filter(|c| matches!(c, CallEvent::SendMessage { .. }))
        .count()
}

// ---------------------------------------------------------------------------
// Trigger times
// ---------------------------------------------------------------------------

#[tokio::test]
async fn record_with_future_trigger_time_is_left_untouched() -> Result<()> {
    let h = harness(1_000, true, DispatchConfig::default())?;
    let message = h.messages.insert("BM-target", "hello")?;
    let record = h
        .queue
        .insert(TaskKind::SendMessage, 1_100, 0, Some(message.id), None)?;

    h.dispatcher.run_pass().await?;

    let after = h.queue.get(record.id)?.unwrap();
    assert_eq!(after.attempts, 0);
    assert_eq!(after.last_attempt_time, 0);
    assert_eq!(after.trigger_time, 1_100);
    assert_eq!(send_calls(&h), 0);
    Ok(())
}

#[tokio::test]
async fn due_record_executes_and_is_touched() -> Result<()> {
    let h = harness(1_000, true, DispatchConfig::default())?;
    let message = h.messages.insert("BM-target", "hello")?;
    let record = h
        .queue
        .insert(TaskKind::SendMessage, 900, 0, Some(message.id), None)?;

    h.dispatcher.run_pass().await?;

    let after = h.queue.get(record.id)?.unwrap();
    assert_eq!(after.attempts, 1);
    assert_eq!(after.last_attempt_time, 1_000);
    assert_eq!(send_calls(&h), 1);
    Ok(())
}

// ---------------------------------------------------------------------------
// Send-family deduplication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn older_send_record_executes_and_newer_is_deferred() -> Result<()> {
    let config = DispatchConfig::default();
    let h = harness(1_000, true, config.clone())?;
    let message = h.messages.insert("BM-target", "hello")?;
    let older = h
        .queue
        .insert(TaskKind::SendMessage, 0, 0, Some(message.id), None)?;
    let newer = h
        .queue
        .insert(TaskKind::SendMessage, 10, 0, Some(message.id), None)?;

    h.dispatcher.run_pass().await?;

    // Exactly one attempt went to the network.
    assert_eq!(send_calls(&h), 1);
    assert!(h
        .controller
        .calls()
        .contains(&CallEvent::SendMessage {
            record: older.id,
            ttl: config.first_attempt_ttl_secs,
        }));

    // The newer record was pushed strictly into the future and the
    // pass was counted against it.
    let deferred = h.queue.get(newer.id)?.unwrap();
    assert_eq!(
        deferred.trigger_time,
        10 + config.first_attempt_ttl_secs
    );
    assert_eq!(deferred.attempts, 1);
    assert_eq!(deferred.last_attempt_time, 1_000);
    Ok(())
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exhausted_record_is_evicted_and_message_marked_failed() -> Result<()> {
    let mut config = DispatchConfig::default();
    config.maximum_attempts = 5;
    let h = harness(1_000, true, config)?;

    let message = h.messages.insert("BM-target", "hello")?;
    let mut record = h
        .queue
        .insert(TaskKind::SendMessage, 0, 0, Some(message.id), None)?;
    record.attempts = 6;
    h.queue.update(&record)?;

    h.dispatcher.run_pass().await?;

    assert!(h.queue.get(record.id)?.is_none());
    assert_eq!(
        h.messages.get(message.id)?.status,
        MessageStatus::SendingFailed
    );
    assert_eq!(send_calls(&h), 0);
    Ok(())
}

#[tokio::test]
async fn record_at_exactly_maximum_attempts_still_executes() -> Result<()> {
    let mut config = DispatchConfig::default();
    config.maximum_attempts = 5;
    let h = harness(1_000, true, config)?;

    let message = h.messages.insert("BM-target", "hello")?;
    let mut record = h
        .queue
        .insert(TaskKind::SendMessage, 0, 0, Some(message.id), None)?;
    record.attempts = 5;
    h.queue.update(&record)?;

    h.dispatcher.run_pass().await?;

    assert_eq!(send_calls(&h), 1);
    assert!(h.queue.get(record.id)?.is_some());
    Ok(())
}

// ---------------------------------------------------------------------------
// Missing objects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn record_for_deleted_message_is_dropped_without_a_call() -> Result<()> {
    let h = harness(1_000, true, DispatchConfig::default())?;
    let record = h.queue.insert(
        TaskKind::SendMessage,
        0,
        0,
        Some(ObjectId::new(999)),
        None,
    )?;

    h.dispatcher.run_pass().await?;

    assert!(h.queue.get(record.id)?.is_none());
    assert_eq!(send_calls(&h), 0);
    Ok(())
}

// ---------------------------------------------------------------------------
// Retry chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_attempt_creates_the_next_follow_up_record() -> Result<()> {
    let config = DispatchConfig::default();
    let h = harness(5_000, true, config.clone())?;
    let message = h.messages.insert("BM-target", "hello")?;
    let retry = h
        .queue
        .insert(TaskKind::SendMessage, 0, 1, Some(message.id), None)?;

    h.dispatcher.run_pass().await?;

    // A retry uses the longer TTL.
    assert!(h.controller.calls().contains(&CallEvent::SendMessage {
        record: retry.id,
        ttl: config.subsequent_attempts_ttl_secs,
    }));

    // And lines up its own successor before running.
    let follow_ups: Vec<_> = h
        .queue
        .records_for_object(message.id)?
        .into_iter()
        .filter(|r| r.id != retry.id)
        .collect();
    assert_eq!(follow_ups.len(), 1);
    assert_eq!(follow_ups[0].record_count, 2);
    assert_eq!(
        follow_ups[0].trigger_time,
        5_000 + config.subsequent_attempts_ttl_secs
    );
    assert_eq!(follow_ups[0].attempts, 0);
    Ok(())
}

// ---------------------------------------------------------------------------
// Offline behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_skip_leaves_record_untouched_when_not_counted() -> Result<()> {
    let mut config = DispatchConfig::default();
    config.count_offline_skips = false;
    let h = harness(1_000, false, config)?;

    let payload = h.directory.insert_payload(vec![1, 2, 3])?;
    let record = h
        .queue
        .insert(TaskKind::DisseminatePubkey, 0, 0, Some(payload.id), None)?;

    let report = h.dispatcher.run_pass().await?;

    let after = h.queue.get(record.id)?.unwrap();
    assert_eq!(after.attempts, 0);
    assert_eq!(after.last_attempt_time, 0);
    assert!(h.controller.calls().is_empty());
    // Offline also suppresses the per-pass checks.
    assert!(!report.checked_for_messages);
    assert!(!report.checked_pubkey_redissemination);
    Ok(())
}

#[tokio::test]
async fn offline_skip_counts_against_the_record_by_default() -> Result<()> {
    let h = harness(1_000, false, DispatchConfig::default())?;

    let payload = h.directory.insert_payload(vec![1, 2, 3])?;
    let record = h
        .queue
        .insert(TaskKind::DisseminatePubkey, 0, 0, Some(payload.id), None)?;

    h.dispatcher.run_pass().await?;

    let after = h.queue.get(record.id)?.unwrap();
    assert_eq!(after.attempts, 1);
    assert_eq!(after.last_attempt_time, 1_000);
    assert!(h.controller.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn process_outgoing_message_runs_even_while_offline() -> Result<()> {
    let h = harness(1_000, false, DispatchConfig::default())?;
    let message = h.messages.insert("BM-target", "hello")?;
    let pubkey = h
        .directory
        .insert_pubkey(4, 1, vec![0x04; 65], vec![0x04; 65])?;
    let record = h.queue.insert(
        TaskKind::ProcessOutgoingMessage,
        0,
        0,
        Some(message.id),
        Some(pubkey.id),
    )?;

    h.dispatcher.run_pass().await?;

    // Payload assembly is local work; no connectivity gate applies.
    assert!(h
        .controller
        .calls()
        .iter()
        .any(|c| matches!(c, CallEvent::ProcessOutgoingMessage { record: id, .. } if *id == record.id)));
    Ok(())
}

// ---------------------------------------------------------------------------
// User-driven entry points
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_send_message_enqueues_first_attempt_and_follow_up() -> Result<()> {
    let config = DispatchConfig::default();
    let h = harness(2_000, true, config.clone())?;
    let message = h.messages.insert("BM-target", "hello")?;

    h.dispatcher.request_send_message(message.id).await?;

    let mut records = h.queue.records_for_object(message.id)?;
    records.sort_by_key(|r| r.record_count);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].task, TaskKind::SendMessage);
    assert_eq!(records[0].trigger_time, 0);
    assert_eq!(records[0].record_count, 0);

    assert_eq!(records[1].task, TaskKind::SendMessage);
    assert_eq!(
        records[1].trigger_time,
        2_000 + config.first_attempt_ttl_secs
    );
    assert_eq!(records[1].record_count, 1);

    // Online, so the first attempt ran immediately.
    assert!(h.controller.calls().contains(&CallEvent::SendMessage {
        record: records[0].id,
        ttl: config.first_attempt_ttl_secs,
    }));
    Ok(())
}

#[tokio::test]
async fn request_send_message_while_offline_only_enqueues() -> Result<()> {
    let h = harness(2_000, false, DispatchConfig::default())?;
    let message = h.messages.insert("BM-target", "hello")?;

    h.dispatcher.request_send_message(message.id).await?;

    assert_eq!(h.queue.records_for_object(message.id)?.len(), 2);
    assert_eq!(send_calls(&h), 0);
    Ok(())
}

#[tokio::test]
async fn request_send_message_for_deleted_message_is_a_no_op() -> Result<()> {
    let h = harness(2_000, true, DispatchConfig::default())?;

    h.dispatcher
        .request_send_message(ObjectId::new(42))
        .await?;

    assert_eq!(h.queue.count()?, 0);
    assert!(h.controller.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn request_create_identity_enqueues_and_runs_immediately() -> Result<()> {
    let h = harness(2_000, false, DispatchConfig::default())?;
    let identity = h.directory.insert_identity("BM-self")?;

    h.dispatcher.request_create_identity(identity.id).await?;

    let records = h.queue.records_for_object(identity.id)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].task, TaskKind::CreateIdentity);
    // Identity creation ignores connectivity.
    assert!(h
        .controller
        .calls()
        .contains(&CallEvent::CreateIdentity {
            record: records[0].id
        }));
    Ok(())
}

#[tokio::test]
async fn request_create_identity_for_deleted_identity_is_a_no_op() -> Result<()> {
    let h = harness(2_000, true, DispatchConfig::default())?;

    h.dispatcher
        .request_create_identity(ObjectId::new(42))
        .await?;

    assert_eq!(h.queue.count()?, 0);
    assert!(h.controller.calls().is_empty());
    Ok(())
}

// ---------------------------------------------------------------------------
// Periodic maintenance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn per_pass_checks_run_only_with_an_identity_and_connectivity() -> Result<()> {
    let h = harness(1_000, true, DispatchConfig::default())?;

    // No identity yet: checks stay off.
    let report = h.dispatcher.run_pass().await?;
    assert!(!report.checked_for_messages);
    assert!(h.controller.calls().is_empty());

    h.directory.insert_identity("BM-self")?;
    let report = h.dispatcher.run_pass().await?;
    assert!(report.checked_for_messages);
    assert!(report.checked_pubkey_redissemination);
    assert_eq!(
        h.controller.calls(),
        vec![
            CallEvent::CheckForMessagesAndSendAcks,
            CallEvent::CheckIfPubkeyDisseminationIsDue,
        ]
    );

    // Going offline turns them off again.
    h.connectivity.set_available(false);
    let report = h.dispatcher.run_pass().await?;
    assert!(!report.checked_for_messages);
    Ok(())
}

#[tokio::test]
async fn database_clean_respects_its_interval() -> Result<()> {
    let config = DispatchConfig::default();
    let h = harness(1_000, true, config.clone())?;

    // Stamped at open time, so nothing is due yet.
    let report = h.dispatcher.run_pass().await?;
    assert!(report.database_clean.is_none());

    // Exactly at the interval boundary is still not due.
    h.clock.advance(config.database_clean_interval_secs);
    let report = h.dispatcher.run_pass().await?;
    assert!(report.database_clean.is_none());

    // One second past the boundary starts a detached clean.
    h.clock.advance(1);
    let report = h.dispatcher.run_pass().await?;
    let handle = report.database_clean.unwrap();
    handle.await.unwrap();
    assert!(h.controller.calls().contains(&CallEvent::CleanDatabase));
    assert_eq!(h.settings.last_database_clean_time()?, h.clock.now());
    Ok(())
}

#[tokio::test]
async fn never_cleaned_store_is_cleaned_on_the_first_pass() -> Result<()> {
    let h = harness(1_000, true, DispatchConfig::default())?;
    h.settings.set_last_database_clean_time(0)?;

    let report = h.dispatcher.run_pass().await?;
    let handle = report.database_clean.unwrap();
    handle.await.unwrap();
    assert!(h.controller.calls().contains(&CallEvent::CleanDatabase));
    Ok(())
}

// ---------------------------------------------------------------------------
// Dissemination tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disseminate_message_resolves_payload_and_pubkey() -> Result<()> {
    let h = harness(1_000, true, DispatchConfig::default())?;
    let payload = h.directory.insert_payload(vec![9, 9, 9])?;
    let pubkey = h
        .directory
        .insert_pubkey(4, 1, vec![0x04; 65], vec![0x04; 65])?;
    let record = h.queue.insert(
        TaskKind::DisseminateMessage,
        0,
        0,
        Some(payload.id),
        Some(pubkey.id),
    )?;

    h.dispatcher.run_pass().await?;

    assert!(h
        .controller
        .calls()
        .contains(&CallEvent::DisseminateMessage { record: record.id }));
    let after = h.queue.get(record.id)?.unwrap();
    assert_eq!(after.attempts, 1);
    Ok(())
}
