//! Poll command implementation
//!
//! Runs exactly one poll invocation and exits, for cron-style scheduling.

use super::{build_engine, load_validated, setup_exit_code, EXIT_FAILED, EXIT_OK};
use crate::core::poll::{PollOutcome, PollReport};
use clap::Args;

/// Arguments for the poll command
#[derive(Args, Debug)]
pub struct PollArgs {}

impl PollArgs {
    /// Execute the poll command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting single poll");

        let config = match load_validated(config_path) {
            Ok(config) => config,
            Err(code) => return Ok(code),
        };

        let engine = match build_engine(&config).await {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize poller");
                eprintln!("Failed to initialize poller: {e}");
                return Ok(setup_exit_code(&e));
            }
        };

        let report = engine.run().await;
        print_report(&report);

        Ok(exit_code(&report))
    }
}

fn exit_code(report: &PollReport) -> i32 {
    if report.is_failed() {
        EXIT_FAILED
    } else {
        EXIT_OK
    }
}

fn print_report(report: &PollReport) {
    eprintln!();
    eprintln!("Poll Summary:");
    eprintln!("  Stream: {}", report.stream);
    eprintln!("  Poll ID: {}", report.poll_id);
    if let Some(previous) = report.previous {
        eprintln!("  Started From: {previous}");
    }
    if let Some(committed) = report.committed {
        eprintln!("  Committed: {committed}");
    }
    eprintln!("  Rows Emitted: {}", report.rows_emitted);
    eprintln!("  Duration: {:.2}s", report.duration.as_secs_f64());
    for axis in &report.closed_axes {
        eprintln!("  Closed Axis: {axis}");
    }

    match &report.outcome {
        PollOutcome::Completed if !report.queried => {
            eprintln!("Range exhausted at its end point, source not queried.")
        }
        PollOutcome::Completed => eprintln!("Poll completed."),
        PollOutcome::Skipped => eprintln!("Poll skipped, another poll is in flight."),
        PollOutcome::Failed { message, retryable } => {
            eprintln!("Poll failed: {message}");
            if *retryable {
                eprintln!("   The watermark was not moved; the next poll re-reads the same range.");
            }
        }
    }
}
