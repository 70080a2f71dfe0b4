//! Periodic maintenance run at the end of every processing pass.
//!
//! Two kinds of work: the cheap per-pass checks (poll for inbound
//! messages and acknowledgments, re-disseminate stale pubkeys), which
//! only make sense when the node is online and at least one identity
//! exists, and the rarer database clean, which runs on its own
//! interval and is detached onto a background task so a slow clean
//! never stretches the pass.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bitpost_store::directory::Directory;
use bitpost_store::settings::SettingsStore;
use bitpost_types::config::DispatchConfig;
use bitpost_types::Result;

use crate::connectivity::ConnectivityProbe;
use crate::controller::TaskController;

// ---------------------------------------------------------------------------
// MaintenanceReport
// ---------------------------------------------------------------------------

/// What a maintenance run actually did.
#[derive(Debug, Default)]
pub struct MaintenanceReport {
    /// Whether the inbound message and acknowledgment check ran.
    pub checked_for_messages: bool,
    /// Whether the pubkey re-dissemination check ran.
    pub checked_pubkey_redissemination: bool,
    /// Handle of the detached database clean, when one was started.
    pub database_clean: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// Periodic tasks
// ---------------------------------------------------------------------------

/// Runs the periodic tasks for one pass.
///
/// Handler failures are logged and swallowed; maintenance never fails
/// the pass that hosts it.
pub async fn run_periodic_tasks(
    directory: &Arc<Directory>,
    settings: &Arc<SettingsStore>,
    controller: &Arc<dyn TaskController>,
    connectivity: &dyn ConnectivityProbe,
    now: u64,
    config: &DispatchConfig,
) -> Result<MaintenanceReport> {
    let mut report = MaintenanceReport::default();

    if connectivity.is_available() && directory.identity_count()? > 0 {
        if let Err(e) = controller.check_for_messages_and_send_acks().await {
            warn!(error = %e, "message and acknowledgment check failed");
        }
        report.checked_for_messages = true;

        if let Err(e) = controller
            .check_if_pubkey_dissemination_is_due(config.do_pow)
            .await
        {
            warn!(error = %e, "pubkey re-dissemination check failed");
        }
        report.checked_pubkey_redissemination = true;
    } else {
        debug!("offline or no identities; skipping per-pass checks");
    }

    if database_cleaning_due(settings, now, config)? {
        // Stamp the clean time before detaching so an overlapping pass
        // cannot start a second clean while this one is still running.
        settings.set_last_database_clean_time(now)?;
        info!("starting detached database clean");
        let controller = Arc::clone(controller);
        report.database_clean = Some(tokio::spawn(async move {
            if let Err(e) = controller.clean_database().await {
                warn!(error = %e, "database clean failed");
            }
        }));
    }

    Ok(report)
}

/// Whether enough time has passed since the last database clean. A
/// store that has never been cleaned is always due.
fn database_cleaning_due(
    settings: &SettingsStore,
    now: u64,
    config: &DispatchConfig,
) -> Result<bool> {
    let last = settings.last_database_clean_time()?;
    if last == 0 {
        return Ok(true);
    }
    Ok(now.saturating_sub(last) > config.database_clean_interval_secs)
}
