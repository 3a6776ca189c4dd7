//! The monitor loop.
//!
//! Two states: running and stopping. Each iteration waits out the interval,
//! then runs one reconciliation cycle on the same task. A shutdown request
//! ends the wait early and the loop exits without starting another cycle.
//! A request that arrives mid-cycle is seen at the next wait.

use std::time::Duration;

use crate::cycle::Reconciler;
use crate::signals::Shutdown;

/// Summary of a finished loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub cycles: u64,
    pub exit_code: i32,
}

/// Run cycles every `interval` until `shutdown` is requested.
pub async fn run(reconciler: &Reconciler, interval: Duration, shutdown: &Shutdown) -> LoopOutcome {
    tracing::info!(interval_secs = interval.as_secs(), "Monitor loop started");
    let mut cycles = 0u64;

    loop {
        tokio::select! {
            // Checked first so a request that landed during the previous
            // cycle wins over an already-elapsed interval.
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!(cycles, "Stop requested, leaving monitor loop");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let report = reconciler.run_cycle().await;
        cycles += 1;
        tracing::debug!(
            cycle = cycles,
            checked = report.checked,
            failed = report.failed.len(),
            detaching = report.detaching.len(),
            collected = report.collected.len(),
            "Cycle complete",
        );
    }

    LoopOutcome {
        cycles,
        exit_code: shutdown.exit_code(),
    }
}
