//! Injected time source.
//!
//! The dispatcher never reads the system clock directly; it asks a
//! [`Clock`], so a pass is deterministically testable without real
//! time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Provides the current time in unix seconds.
pub trait Clock: Send + Sync {
    /// Returns the current unix time in seconds.
    fn now(&self) -> u64;
}

/// Production clock reading UTC wall time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-1970 wall clocks are a host misconfiguration; clamp to 0
        // rather than panic inside a scheduler pass.
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock fixed at `now` seconds.
    pub fn at(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Moves the clock to an absolute time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advances the clock by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
