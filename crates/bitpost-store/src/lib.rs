//! Durable stores for the bitpost dispatch engine.
//!
//! Every store follows the same shape: a `Mutex`-guarded in-memory
//! `Vec`, persisted to its own file on every mutation with an atomic
//! write-temp-then-rename flow. Decisions made by the dispatcher are
//! therefore always derivable from disk — the process can be killed
//! and restarted at any point without losing or duplicating work.
//!
//! # Modules
//!
//! - [`store_file`] — shared atomic load/save primitives
//! - [`queue`] — queue records (the task queue itself)
//! - [`messages`] — outgoing messages and their statuses
//! - [`directory`] — local identities, pubkeys, and wire payloads
//! - [`settings`] — small persisted engine state (last clean time)

pub mod directory;
pub mod messages;
pub mod queue;
pub mod settings;
pub mod store_file;
