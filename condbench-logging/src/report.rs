//! Periodic diagnostics reporting
//!
//! The reporter logs a serialisable snapshot on a fixed interval. It never
//! blocks the caller and never surfaces errors: a snapshot that fails to
//! serialise is logged at `warn` and skipped.

use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Log target used for diagnostics lines
pub const DIAGNOSTICS_TARGET: &str = "condbench::diagnostics";

/// Spawn a task that logs `snapshot()` every `interval` until `cancel` fires
pub fn spawn_periodic_reporter<F, S>(
    interval: Duration,
    cancel: CancellationToken,
    snapshot: F,
) -> JoinHandle<()>
where
    F: Fn() -> S + Send + 'static,
    S: Serialize,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match serde_json::to_string(&snapshot()) {
                        Ok(line) => info!(target: DIAGNOSTICS_TARGET, "{}", line),
                        Err(e) => warn!(target: DIAGNOSTICS_TARGET, "Failed to serialise diagnostics: {}", e),
                    }
                }
            }
        }
    })
}
