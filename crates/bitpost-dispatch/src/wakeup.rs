//! The wake-up loop that drives the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::dispatcher::Dispatcher;

/// Runs processing passes on the configured wake-up interval.
///
/// Each pass runs to completion before the next delay is armed, so
/// passes never overlap: a pass that takes longer than the interval
/// simply delays its successor.
pub struct DispatchLoop {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchLoop {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Runs passes forever. Pass-level failures (store errors) are
    /// logged and the loop keeps going; transient conditions should
    /// not take the engine down.
    pub async fn run(self) {
        let interval = Duration::from_secs(self.dispatcher.config().wakeup_interval_secs);
        info!(interval_secs = interval.as_secs(), "dispatch loop started");
        loop {
            if let Err(e) = self.dispatcher.run_pass().await {
                error!(error = %e, "dispatch pass failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}
