//! Poll invocation reporting
//!
//! Structures describing what one poll invocation (or a whole scheduler run)
//! did. Poll-time failures are reported here instead of being returned as errors.

use crate::core::state::watermark::Watermark;
use crate::domain::Axis;
use std::time::Duration;
use uuid::Uuid;

/// How a poll invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Scan finished and the watermark was committed
    Completed,
    /// Another invocation was still in flight
    Skipped,
    /// The invocation aborted without committing
    Failed {
        /// Error message
        message: String,
        /// Whether the next tick may succeed
        retryable: bool,
    },
}

/// Result of one poll invocation
#[derive(Debug, Clone)]
pub struct PollReport {
    /// Identifier of this invocation, attached to its log span
    pub poll_id: Uuid,

    /// Stream that was polled
    pub stream: String,

    /// How the invocation ended
    pub outcome: PollOutcome,

    /// Rows forwarded to the sink, including rows forwarded before a failure
    pub rows_emitted: u64,

    /// Watermark the invocation started from
    pub previous: Option<Watermark>,

    /// Watermark after commit (only for completed invocations)
    pub committed: Option<Watermark>,

    /// Axes whose active end point has been reached
    pub closed_axes: Vec<Axis>,

    /// Whether the source was queried at all
    pub queried: bool,

    /// Wall-clock duration of the invocation
    pub duration: Duration,
}

impl PollReport {
    pub(crate) fn new(stream: impl Into<String>) -> Self {
        Self {
            poll_id: Uuid::new_v4(),
            stream: stream.into(),
            outcome: PollOutcome::Completed,
            rows_emitted: 0,
            previous: None,
            committed: None,
            closed_axes: Vec::new(),
            queried: false,
            duration: Duration::ZERO,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the invocation committed
    pub fn is_completed(&self) -> bool {
        self.outcome == PollOutcome::Completed
    }

    /// Whether the invocation aborted
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PollOutcome::Failed { .. })
    }

    /// Whether the watermark moved
    pub fn advanced(&self) -> bool {
        match (self.previous, self.committed) {
            (Some(previous), Some(committed)) => committed > previous,
            _ => false,
        }
    }
}

/// Totals over a scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Invocations started
    pub invocations: u64,

    /// Invocations that committed
    pub completed: u64,

    /// Invocations that aborted
    pub failures: u64,

    /// Invocations skipped because one was in flight
    pub skipped: u64,

    /// Rows forwarded across all invocations
    pub rows_emitted: u64,

    /// Whether the run ended because of a shutdown signal
    pub interrupted: bool,
}

impl SchedulerSummary {
    /// Fold one invocation into the totals
    pub fn record(&mut self, report: &PollReport) {
        self.invocations += 1;
        self.rows_emitted += report.rows_emitted;
        match report.outcome {
            PollOutcome::Completed => self.completed += 1,
            PollOutcome::Skipped => self.skipped += 1,
            PollOutcome::Failed { .. } => self.failures += 1,
        }
    }

    /// Log the totals
    pub fn log_summary(&self) {
        tracing::info!(
            invocations = self.invocations,
            completed = self.completed,
            failures = self.failures,
            skipped = self.skipped,
            rows_emitted = self.rows_emitted,
            interrupted = self.interrupted,
            "Poll scheduler stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advanced() {
        let mut report = PollReport::new("orders");
        assert!(!report.advanced());

        report.previous = Some(Watermark::new(1000, 0));
        report.committed = Some(Watermark::new(1000, 0));
        assert!(!report.advanced());

        report.committed = Some(Watermark::new(1010, 1));
        assert!(report.advanced());
    }

    #[test]
    fn test_summary_record() {
        let mut summary = SchedulerSummary::default();

        let mut ok = PollReport::new("orders");
        ok.rows_emitted = 3;
        summary.record(&ok);

        let mut failed = PollReport::new("orders");
        failed.rows_emitted = 2;
        failed.outcome = PollOutcome::Failed {
            message: "boom".to_string(),
            retryable: true,
        };
        summary.record(&failed);

        let mut skipped = PollReport::new("orders");
        skipped.outcome = PollOutcome::Skipped;
        summary.record(&skipped);

        assert_eq!(summary.invocations, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.rows_emitted, 5);
    }
}
