//! Poll engine - one bounded, resumable extraction per invocation
//!
//! Each invocation reads the store state through a [`PollLease`], builds the
//! range query, streams the result set to the sink while tracking the
//! candidate watermark, and commits the candidate once the result set is
//! exhausted. Any failure before the commit leaves the watermark untouched.
//!
//! [`PollLease`]: crate::core::state::PollLease

use crate::adapters::database::traits::SourceTable;
use crate::adapters::sink::RowSink;
use crate::core::poll::query::QuerySpec;
use crate::core::poll::report::{PollOutcome, PollReport};
use crate::core::state::{Watermark, WatermarkStore};
use crate::domain::context::ResultExt;
use crate::domain::{Axis, Result, SourceRow};
use crate::{log_error_with_context, log_poll_complete, log_poll_start};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::Instrument;

/// Advance the candidate watermark past one scanned row
///
/// Only a strictly greater update-ts moves the candidate, and then it takes
/// the row's partition with it. Rows at or below the candidate's update-ts
/// leave it unchanged.
///
/// # Examples
///
/// ```
/// use tidemark::core::poll::engine::advance;
/// use tidemark::core::state::Watermark;
/// use tidemark::domain::SourceRow;
///
/// let mut candidate = Watermark::new(1000, 0);
/// for row in [SourceRow::new(1005, 0), SourceRow::new(1010, 1), SourceRow::new(1005, 2)] {
///     candidate = advance(candidate, &row);
/// }
/// assert_eq!(candidate, Watermark::new(1010, 1));
/// ```
pub fn advance(candidate: Watermark, row: &SourceRow) -> Watermark {
    if row.update_ts > candidate.update_ts {
        Watermark::new(row.update_ts, row.partition)
    } else {
        candidate
    }
}

/// Single-flight poll engine for one stream
pub struct PollEngine {
    spec: QuerySpec,
    source: Arc<dyn SourceTable + Send + Sync>,
    sink: Arc<dyn RowSink + Send + Sync>,
    store: Arc<WatermarkStore>,
    in_flight: Mutex<()>,
}

impl PollEngine {
    /// Create a new poll engine
    pub fn new(
        spec: QuerySpec,
        source: Arc<dyn SourceTable + Send + Sync>,
        sink: Arc<dyn RowSink + Send + Sync>,
        store: Arc<WatermarkStore>,
    ) -> Self {
        Self {
            spec,
            source,
            sink,
            store,
            in_flight: Mutex::new(()),
        }
    }

    /// Store this engine commits to
    pub fn store(&self) -> &Arc<WatermarkStore> {
        &self.store
    }

    /// Run one poll invocation
    ///
    /// Never returns an error: failures are logged and reported in the
    /// returned [`PollReport`], and the watermark stays where it was. If
    /// another invocation is still running, this one is skipped.
    pub async fn run(&self) -> PollReport {
        let started = Instant::now();
        let stream = self.store.stream().to_string();

        let Ok(_in_flight) = self.in_flight.try_lock() else {
            tracing::warn!(stream = %stream, "Previous poll still in flight, skipping this tick");
            let mut report = PollReport::new(stream);
            report.outcome = PollOutcome::Skipped;
            return report.with_duration(started.elapsed());
        };

        let mut report = PollReport::new(stream.clone());
        let span = tracing::info_span!("poll", stream = %stream, poll_id = %report.poll_id);
        match self.poll(&mut report).instrument(span).await {
            Ok(()) => {
                log_poll_complete!(&stream, report.rows_emitted, started.elapsed());
            }
            Err(e) => {
                log_error_with_context!(&e, "Poll aborted, watermark not committed");
                tracing::warn!(
                    stream = %stream,
                    rows_emitted = report.rows_emitted,
                    watermark = ?report.previous,
                    "Rows forwarded before the failure will be read again on the next poll"
                );
                report.outcome = PollOutcome::Failed {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                };
                report.committed = None;
            }
        }

        report.with_duration(started.elapsed())
    }

    async fn poll(&self, report: &mut PollReport) -> Result<()> {
        let lease = self.store.begin_poll().await?;
        let state = lease.state().clone();
        report.previous = Some(state.watermark);
        log_poll_start!(&state.stream, &state.watermark);

        let query = self.spec.build(&state);
        if query.bounds.is_empty() {
            tracing::debug!(
                stream = %state.stream,
                watermark = %state.watermark,
                "Range is exhausted at its end point, not querying"
            );
            report.committed = Some(state.watermark);
            report.closed_axes = state.closed_axes();
            return Ok(());
        }

        tracing::debug!(sql = %query.sql, params = ?query.params, "Executing range query");
        report.queried = true;

        let mut cursor = self
            .source
            .open(&query)
            .await
            .with_context(|| format!("Failed to query {}", self.spec.table()))?;
        let mut candidate = state.watermark;
        while let Some(row) = cursor.next_row().await? {
            candidate = advance(candidate, &row);
            self.sink.send(&row).await?;
            report.rows_emitted += 1;
        }
        drop(cursor);
        self.sink.flush().await?;

        let committed = lease.commit(candidate).await?;
        report.committed = Some(committed.watermark);
        report.closed_axes = committed.closed_axes();

        for axis in &report.closed_axes {
            self.notify_closed(*axis, state.is_closed(*axis), &committed.watermark);
        }
        Ok(())
    }

    fn notify_closed(&self, axis: Axis, was_closed: bool, watermark: &Watermark) {
        if was_closed {
            tracing::debug!(
                stream = %self.store.stream(),
                axis = %axis,
                "Axis remains closed at its end point"
            );
        } else {
            tracing::info!(
                stream = %self.store.stream(),
                axis = %axis,
                watermark = %watermark,
                "Closed range: watermark reached the end point, this axis will not advance until an operator clears or moves it"
            );
        }
    }
}
