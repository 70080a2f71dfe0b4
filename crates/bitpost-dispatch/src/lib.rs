//! Task scheduling and retry engine.
//!
//! The dispatcher is woken periodically rather than running
//! continuously: every decision it makes is derived purely from
//! persisted state, so the process is safe to kill and restart at any
//! point without losing or duplicating work.
//!
//! # Modules
//!
//! - [`clock`] — injected time source
//! - [`connectivity`] — injected network-availability probe
//! - [`controller`] — the handler seam to transport, crypto, and PoW
//! - [`decision`] — pure execute/defer/evict policy
//! - [`dispatcher`] — the per-wake-up processing pass
//! - [`maintenance`] — periodic checks and gated database cleaning
//! - [`wakeup`] — the tokio loop that re-arms the timer
//! - [`testing`] — recording controller double for tests

pub mod clock;
pub mod connectivity;
pub mod controller;
pub mod decision;
pub mod dispatcher;
pub mod maintenance;
pub mod testing;
pub mod wakeup;
