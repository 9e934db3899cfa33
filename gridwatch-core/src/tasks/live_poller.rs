// gridwatch-core/src/tasks/live_poller.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PollerConfig;
use crate::services::session_controller::SessionController;
use crate::Error;

/// Spawns the background task that refreshes live status for the session.
///
/// The first cycle runs immediately. A cycle in flight when `cancel` fires
/// is dropped. Transient failures back off exponentially up to
/// `max_backoff`; any other failure just waits for the next regular cycle.
pub fn spawn_live_poller(
    session: Arc<SessionController>,
    config: PollerConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut failures: u32 = 0;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = session.poll_once() => result,
            };

            match result {
                Ok(report) => {
                    failures = 0;
                    debug!(
                        "Poll cycle: {} updated, {} discarded, {} went live, {} went offline",
                        report.updated,
                        report.discarded,
                        report.went_live.len(),
                        report.went_offline.len()
                    );
                }
                Err(e) if e.is_transient() => {
                    failures = failures.saturating_add(1);
                    warn!("Poll cycle hit a transient error ({} in a row): {}", failures, e);
                }
                Err(e @ Error::Credential(_)) => {
                    failures = 0;
                    error!("Poll cycle skipped, could not obtain an app token: {}", e);
                }
                Err(e) => {
                    failures = 0;
                    warn!("Poll cycle skipped: {}", e);
                }
            }

            let delay = next_delay(&config, failures);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(delay) => {}
            }
        }
        info!("Live poller stopped");
    })
}

/// Regular interval after a success, doubled per consecutive transient
/// failure and capped at `max_backoff`.
pub fn next_delay(config: &PollerConfig, failures: u32) -> Duration {
    if failures == 0 {
        return config.interval;
    }
    let factor = 1u32 << failures.min(16);
    config
        .interval
        .checked_mul(factor)
        .unwrap_or(config.max_backoff)
        .min(config.max_backoff.max(config.interval))
}
