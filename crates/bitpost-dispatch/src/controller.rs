//! The handler seam: where scheduled work actually happens.
//!
//! The dispatcher resolves domain objects and decides *when* to act;
//! a [`TaskController`] implementation performs the act itself —
//! encryption, proof of work, and transport I/O all live behind this
//! trait. Network errors and proof-of-work delays are the handler's
//! own responsibility: a returned error is logged and the record's
//! unit of work ends for this pass, but the pass itself never aborts.
//!
//! On success a handler deletes the record that drove the attempt (or
//! replaces it with the next record in the chain, e.g. send-message →
//! process-outgoing-message → disseminate-message).

use async_trait::async_trait;

use bitpost_store::directory::{Identity, PayloadRecord, PubkeyRecord};
use bitpost_store::messages::Message;
use bitpost_store::queue::QueueRecord;
use bitpost_types::Result;

/// Performs the network action for each task kind.
#[async_trait]
pub trait TaskController: Send + Sync {
    /// Starts the sending chain for a message. `ttl` bounds the msg
    /// object's validity; `ack_ttl` bounds the acknowledgment object
    /// embedded in it.
    async fn send_message(
        &self,
        record: &QueueRecord,
        message: &Message,
        do_pow: bool,
        ttl: u64,
        ack_ttl: u64,
    ) -> Result<()>;

    /// Encrypts, signs and proof-of-works an outgoing message for the
    /// resolved destination pubkey.
    async fn process_outgoing_message(
        &self,
        record: &QueueRecord,
        message: &Message,
        pubkey: &PubkeyRecord,
        do_pow: bool,
        ttl: u64,
    ) -> Result<()>;

    /// Broadcasts a processed message payload onto the network.
    async fn disseminate_message(
        &self,
        record: &QueueRecord,
        payload: &PayloadRecord,
        pubkey: &PubkeyRecord,
        do_pow: bool,
    ) -> Result<()>;

    /// Broadcasts a pubkey payload onto the network.
    async fn disseminate_pubkey(
        &self,
        record: &QueueRecord,
        payload: &PayloadRecord,
        do_pow: bool,
    ) -> Result<()>;

    /// Completes identity creation for a local address and schedules
    /// dissemination of its pubkey.
    async fn create_identity(
        &self,
        record: &QueueRecord,
        identity: &Identity,
        do_pow: bool,
    ) -> Result<()>;

    /// Polls for new incoming messages and sends acknowledgments.
    /// Idempotent; retried unconditionally every wake-up.
    async fn check_for_messages_and_send_acks(&self) -> Result<()>;

    /// Re-disseminates any local pubkey whose previous dissemination
    /// has expired. Idempotent; retried unconditionally every wake-up.
    async fn check_if_pubkey_dissemination_is_due(&self, do_pow: bool) -> Result<()>;

    /// Deletes defunct data from the database. Runs as a detached
    /// unit of work, never inline in a pass.
    async fn clean_database(&self) -> Result<()>;
}
