//! Test doubles for exercising the dispatcher without a network.

use std::sync::Mutex;

use async_trait::async_trait;

use bitpost_store::directory::{Identity, PayloadRecord, PubkeyRecord};
use bitpost_store::messages::Message;
use bitpost_store::queue::QueueRecord;
use bitpost_types::{RecordId, Result};

use crate::controller::TaskController;

/// One handler invocation observed by a [`RecordingController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    SendMessage { record: RecordId, ttl: u64 },
    ProcessOutgoingMessage { record: RecordId, ttl: u64 },
    DisseminateMessage { record: RecordId },
    DisseminatePubkey { record: RecordId },
    CreateIdentity { record: RecordId },
    CheckForMessagesAndSendAcks,
    CheckIfPubkeyDisseminationIsDue,
    CleanDatabase,
}

/// A controller that records every call it receives.
#[derive(Default)]
pub struct RecordingController {
    calls: Mutex<Vec<CallEvent>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything invoked so far, in order.
    pub fn calls(&self) -> Vec<CallEvent> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, event: CallEvent) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[async_trait]
impl TaskController for RecordingController {
    async fn send_message(
        &self,
        record: &QueueRecord,
        _message: &Message,
        _do_pow: bool,
        ttl: u64,
        _ack_ttl: u64,
    ) -> Result<()> {
        self.record(CallEvent::SendMessage {
            record: record.id,
            ttl,
        });
        Ok(())
    }

    async fn process_outgoing_message(
        &self,
        record: &QueueRecord,
        _message: &Message,
        _pubkey: &PubkeyRecord,
        _do_pow: bool,
        ttl: u64,
    ) -> Result<()> {
        self.record(CallEvent::ProcessOutgoingMessage {
            record: record.id,
            ttl,
        });
        Ok(())
    }

    async fn disseminate_message(
        &self,
        record: &QueueRecord,
        _payload: &PayloadRecord,
        _pubkey: &PubkeyRecord,
        _do_pow: bool,
    ) -> Result<()> {
        self.record(CallEvent::DisseminateMessage { record: record.id });
        Ok(())
    }

    async fn disseminate_pubkey(
        &self,
        record: &QueueRecord,
        _payload: &PayloadRecord,
        _do_pow: bool,
    ) -> Result<()> {
        self.record(CallEvent::DisseminatePubkey { record: record.id });
        Ok(())
    }

    async fn create_identity(
        &self,
        record: &QueueRecord,
        _identity: &Identity,
        _do_pow: bool,
    ) -> Result<()> {
        self.record(CallEvent::CreateIdentity { record: record.id });
        Ok(())
    }

    async fn check_for_messages_and_send_acks(&self) -> Result<()> {
        self.record(CallEvent::CheckForMessagesAndSendAcks);
        Ok(())
    }

    async fn check_if_pubkey_dissemination_is_due(&self, _do_pow: bool) -> Result<()> {
        self.record(CallEvent::CheckIfPubkeyDisseminationIsDue);
        Ok(())
    }

    async fn clean_database(&self) -> Result<()> {
        self.record(CallEvent::CleanDatabase);
        Ok(())
    }
}
