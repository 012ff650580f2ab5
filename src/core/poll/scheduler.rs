//! Fixed-delay poll scheduler
//!
//! Drives a [`PollEngine`] from a single task: wait, poll, wait again. The
//! delay starts counting only after an invocation finishes, so invocations
//! can never overlap. A shutdown signal stops the loop between invocations;
//! an invocation already running always completes its commit.

use crate::core::poll::engine::PollEngine;
use crate::core::poll::report::SchedulerSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Timer settings for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Wait before the first invocation
    pub initial_delay: Duration,

    /// Wait between the end of one invocation and the start of the next
    pub delay: Duration,
}

impl ScheduleSettings {
    /// Settings from whole seconds
    pub fn from_secs(initial_delay_secs: u64, delay_secs: u64) -> Self {
        Self {
            initial_delay: Duration::from_secs(initial_delay_secs),
            delay: Duration::from_secs(delay_secs),
        }
    }
}

/// Periodic driver for one poll engine
pub struct PollScheduler {
    engine: Arc<PollEngine>,
    settings: ScheduleSettings,
}

impl PollScheduler {
    /// Create a new scheduler
    pub fn new(engine: Arc<PollEngine>, settings: ScheduleSettings) -> Self {
        Self { engine, settings }
    }

    /// Poll until shutdown is signalled
    ///
    /// `shutdown` carrying `true`, or its sender being dropped, ends the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SchedulerSummary {
        let mut summary = SchedulerSummary::default();
        let mut wait = self.settings.initial_delay;

        tracing::info!(
            stream = %self.engine.store().stream(),
            initial_delay_ms = self.settings.initial_delay.as_millis() as u64,
            delay_ms = self.settings.delay.as_millis() as u64,
            "Poll scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                summary.interrupted = true;
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        summary.interrupted = true;
                        break;
                    }
                    continue;
                }
            }

            // Outside the select: a shutdown arriving mid-scan must not cancel it.
            let report = self.engine.run().await;
            summary.record(&report);
            wait = self.settings.delay;
        }

        summary.log_summary();
        summary
    }
}
