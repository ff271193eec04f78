//! Background tasks for the Rawi server.
//!
//! Includes:
//! - Sweeping orphaned artifact and scratch files.

use rawi_voice::ArtifactStore;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Starts the orphan sweep task.
///
/// This task runs indefinitely, periodically removing artifact files that are
/// no longer current and scratch files older than `max_age_seconds`. These are
/// left behind when a run is interrupted between writing and publishing.
pub async fn start_sweep_task(
    artifacts: Arc<ArtifactStore>,
    interval_seconds: u64,
    max_age_seconds: u64,
) {
    if interval_seconds == 0 {
        tracing::warn!("artifact sweep task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    let max_age = Duration::from_secs(max_age_seconds);

    tracing::info!(
        interval_seconds,
        max_age_seconds,
        "starting artifact sweep task"
    );

    loop {
        sleep(interval).await;

        match artifacts.sweep_orphans(max_age).await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!(count, "removed orphaned audio files");
                } else {
                    tracing::debug!("no orphaned audio files to remove");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sweep orphaned audio files");
            }
        }
    }
}
