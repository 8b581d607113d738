// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the workers, the archive scheduler and the
//! gateway all watch. Background tasks are then drained with a deadline.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
            }
        }
        Err(e) => {
            warn!(error = %e, "could not install SIGTERM handler, listening for Ctrl+C only");
            let _ = ctrl_c.await;
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

/// Waits up to `timeout` for `tasks` to finish, aborting the stragglers.
///
/// Returns the number of tasks that had to be aborted.
pub async fn drain_tasks(tasks: Vec<JoinHandle<()>>, timeout: Duration) -> usize {
    if tasks.is_empty() {
        info!("no background tasks to drain");
        return 0;
    }

    info!(count = tasks.len(), "waiting for background tasks to complete");
    let deadline = tokio::time::Instant::now() + timeout;
    let mut aborted = 0;

    for mut task in tasks {
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "background task ended abnormally"),
            Err(_) => {
                task.abort();
                aborted += 1;
            }
        }
    }

    if aborted == 0 {
        info!("all background tasks drained");
    } else {
        warn!(aborted, "timeout reached, some background tasks interrupted");
    }
    aborted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_empty_task_list() {
        assert_eq!(drain_tasks(Vec::new(), Duration::from_millis(10)).await, 0);
    }

    #[tokio::test]
    async fn drain_waits_for_finished_tasks() {
        let tasks = vec![
            tokio::spawn(async {}),
            tokio::spawn(async { tokio::time::sleep(Duration::from_millis(5)).await }),
        ];
        assert_eq!(drain_tasks(tasks, Duration::from_secs(2)).await, 0);
    }

    #[tokio::test]
    async fn drain_aborts_stuck_tasks() {
        let tasks = vec![tokio::spawn(std::future::pending::<()>())];
        assert_eq!(drain_tasks(tasks, Duration::from_millis(20)).await, 1);
    }
}
