//! Run command implementation
//!
//! Starts the poll scheduler and keeps polling until SIGINT/SIGTERM.

use super::{build_engine, load_validated, setup_exit_code, EXIT_INTERRUPTED, EXIT_OK};
use crate::core::poll::{PollScheduler, SchedulerSummary};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip the initial delay and poll immediately
    #[arg(long)]
    pub now: bool,

    /// Override the delay between polls (seconds)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_validated(config_path) {
            Ok(config) => config,
            Err(code) => return Ok(code),
        };

        if let Some(interval) = self.interval {
            if interval == 0 {
                eprintln!("--interval must be greater than 0");
                return Ok(super::EXIT_CONFIG);
            }
            tracing::info!(interval_secs = interval, "Overriding poll interval from CLI");
            config.schedule.poll_interval_seconds = interval;
        }

        let mut settings = config.schedule.settings();
        if self.now {
            settings.initial_delay = Duration::ZERO;
        }
        let shutdown_timeout = Duration::from_secs(config.schedule.shutdown_timeout_secs);

        let engine = match build_engine(&config).await {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize poller");
                eprintln!("Failed to initialize poller: {e}");
                return Ok(setup_exit_code(&e));
            }
        };

        let watermark = engine.store().current().await;
        eprintln!("Polling stream '{}' from {}", engine.store().stream(), watermark);
        eprintln!(
            "  Interval: {}s (first poll in {}s)",
            settings.delay.as_secs(),
            settings.initial_delay.as_secs()
        );

        let scheduler = PollScheduler::new(engine, settings);
        let summary = match run_until_stopped(&scheduler, shutdown_signal, shutdown_timeout).await {
            Some(summary) => summary,
            None => {
                tracing::warn!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "In-flight poll did not finish within the shutdown timeout, its rows will be re-read"
                );
                eprintln!("Shutdown timeout reached before the in-flight poll finished.");
                return Ok(EXIT_INTERRUPTED);
            }
        };

        print_summary(&summary);

        if summary.interrupted {
            tracing::info!("Run interrupted by user signal");
            Ok(EXIT_INTERRUPTED)
        } else {
            Ok(EXIT_OK)
        }
    }
}

/// Drive the scheduler until it stops
///
/// Once shutdown is signalled the scheduler gets `shutdown_timeout` to let an
/// in-flight poll reach its commit; `None` means it did not.
async fn run_until_stopped(
    scheduler: &PollScheduler,
    shutdown: watch::Receiver<bool>,
    shutdown_timeout: Duration,
) -> Option<SchedulerSummary> {
    let watcher = shutdown.clone();
    let run = scheduler.run(shutdown);
    tokio::pin!(run);

    tokio::select! {
        summary = &mut run => Some(summary),
        () = stop_requested(watcher) => {
            tokio::time::timeout(shutdown_timeout, &mut run).await.ok()
        }
    }
}

async fn stop_requested(mut watcher: watch::Receiver<bool>) {
    let _ = watcher.wait_for(|stop| *stop).await;
}

fn print_summary(summary: &SchedulerSummary) {
    eprintln!();
    eprintln!("Run Summary:");
    eprintln!("  Polls: {}", summary.invocations);
    eprintln!("  Completed: {}", summary.completed);
    eprintln!("  Failed: {}", summary.failures);
    eprintln!("  Skipped: {}", summary.skipped);
    eprintln!("  Rows Emitted: {}", summary.rows_emitted);
}
