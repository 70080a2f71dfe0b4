//! Injected network-availability probe.
//!
//! Consulted before any network-dependent task or periodic check. The
//! contract is "cheap and non-blocking-long": the production
//! implementation is supplied by the host (typically a platform
//! connectivity API or a cached socket probe), never a live network
//! round trip inside the pass.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answers "is a network path currently available?".
pub trait ConnectivityProbe: Send + Sync {
    /// Returns true when a network path is currently available.
    fn is_available(&self) -> bool;
}

/// Probe backed by a settable flag.
///
/// Used directly in tests, and by hosts that feed platform
/// connectivity events into the flag.
#[derive(Debug)]
pub struct StaticConnectivity {
    available: AtomicBool,
}

impl StaticConnectivity {
    /// Creates a probe with the given initial state.
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
        }
    }

    /// Updates the availability flag.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for StaticConnectivity {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
