// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background expiry monitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::credential::manager::{RefreshTrigger, TokenManager};
use crate::error::TokenError;

/// What one monitor pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing stored yet.
    Empty,
    /// Token is outside the refresh window.
    Fresh,
    Refreshed,
    /// Refresh (or storage) failed; retried on the next tick.
    Failed(TokenError),
}

/// Spawn the monitor loop. It checks once immediately, then every
/// `interval`, refreshing when the token is within `skew` of expiry.
pub fn spawn_monitor(
    manager: Arc<TokenManager>,
    interval: Duration,
    skew: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            // A refresh in progress is allowed to finish before shutdown.
            run_cycle(&manager, skew).await;
        }
        tracing::debug!("expiry monitor stopped");
    })
}

/// One monitor pass. Errors are logged and swallowed.
pub async fn run_cycle(manager: &TokenManager, skew: Duration) -> CycleOutcome {
    match manager.ensure_fresh(skew, RefreshTrigger::Monitor).await {
        Ok(checked) if checked.refreshed => CycleOutcome::Refreshed,
        Ok(_) => CycleOutcome::Fresh,
        Err(TokenError::NotAuthorized) => {
            tracing::debug!("no credential stored, skipping expiry check");
            CycleOutcome::Empty
        }
        Err(e) => {
            tracing::warn!(err = %e, "background refresh failed");
            CycleOutcome::Failed(e)
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
