//! Integration tests for the poll engine
//!
//! These tests drive full poll invocations against the in-memory source,
//! state storage and sink, and verify that:
//! - Committed watermarks never move backwards without an operator reseed
//! - Reseeding moves the lower bound of the next query
//! - A failed invocation re-reads the same range on the next poll
//! - End points close an axis and stop further reads

use serde_json::json;
use std::sync::Arc;
use test_case::test_case;
use tidemark::adapters::database::StateStorage;
use tidemark::adapters::memory::{InMemorySource, InMemoryStateStorage};
use tidemark::adapters::sink::{ChannelSink, MemorySink};
use tidemark::core::poll::{PollEngine, PollOutcome, Projection, QuerySpec};
use tidemark::core::state::{SeedOptions, Watermark, WatermarkStore};
use tidemark::domain::{Axis, ColumnName, SourceRow, TableName, TidemarkError};

struct Harness {
    engine: PollEngine,
    source: Arc<InMemorySource>,
    sink: Arc<MemorySink>,
    storage: Arc<InMemoryStateStorage>,
}

impl Harness {
    async fn new(rows: Vec<SourceRow>, seed: Watermark) -> Self {
        let source = Arc::new(InMemorySource::new(rows));
        let sink = Arc::new(MemorySink::new());
        let storage = Arc::new(InMemoryStateStorage::new());
        let store = WatermarkStore::open("db.table", storage.clone(), &seed_options(seed))
            .await
            .unwrap();

        Self {
            engine: PollEngine::new(spec(), source.clone(), sink.clone(), Arc::new(store)),
            source,
            sink,
            storage,
        }
    }

    async fn watermark(&self) -> Watermark {
        self.engine.store().current().await
    }

    fn emitted(&self) -> Vec<(i64, i64)> {
        self.sink
            .rows()
            .iter()
            .map(|row| (row.update_ts, row.partition))
            .collect()
    }
}

fn spec() -> QuerySpec {
    QuerySpec::new(
        TableName::new("db.table").unwrap(),
        ColumnName::new("update_ts").unwrap(),
        ColumnName::new("partition_ts").unwrap(),
        Projection::All,
    )
    .unwrap()
}

fn seed_options(seed: Watermark) -> SeedOptions {
    SeedOptions {
        update_ts: Some(seed.update_ts),
        partition: Some(seed.partition),
        resume: true,
    }
}

fn row(update_ts: i64, partition: i64) -> SourceRow {
    SourceRow::new(update_ts, partition)
        .with_column("update_ts", json!(update_ts))
        .with_column("partition_ts", json!(partition))
}

#[tokio::test]
async fn test_scenario_candidate_tracks_strictly_greater_update_ts() {
    let h = Harness::new(
        vec![row(1005, 0), row(1010, 1), row(1005, 2)],
        Watermark::new(1000, 0),
    )
    .await;

    let report = h.engine.run().await;

    assert!(report.is_completed());
    assert_eq!(report.rows_emitted, 3);
    assert_eq!(h.emitted(), vec![(1005, 0), (1010, 1), (1005, 2)]);
    assert_eq!(report.committed, Some(Watermark::new(1010, 1)));
    assert_eq!(h.watermark().await, Watermark::new(1010, 1));

    let stored = h.storage.load("db.table").await.unwrap().unwrap();
    assert_eq!(stored.watermark, Watermark::new(1010, 1));
}

#[tokio::test]
async fn test_query_uses_watermark_as_lower_bound() {
    let h = Harness::new(vec![], Watermark::new(1000, 3)).await;

    h.engine.run().await;

    let queries = h.source.executed_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].params, vec![1000, 3]);
    assert!(queries[0].sql.contains("\"update_ts\" > $1::BIGINT"));
    assert!(queries[0].sql.contains("\"partition_ts\" >= $2::BIGINT"));
    assert!(!queries[0].sql.contains("ORDER BY"));
}

#[tokio::test]
async fn test_successive_commits_are_monotonic() {
    let h = Harness::new(vec![row(1001, 0)], Watermark::new(1000, 0)).await;
    let mut previous = h.watermark().await;

    for batch in [
        vec![row(1003, 0), row(1002, 0)],
        vec![],
        vec![row(1003, 5)],
        vec![row(1100, 1), row(1050, 2)],
    ] {
        h.engine.run().await;
        let current = h.watermark().await;
        assert!(current >= previous, "{current} regressed from {previous}");
        previous = current;
        h.source.insert(batch);
    }

    h.engine.run().await;
    assert_eq!(h.watermark().await, Watermark::new(1100, 1));
}

#[tokio::test]
async fn test_row_sharing_committed_update_ts_is_not_reread() {
    let h = Harness::new(vec![row(1010, 1)], Watermark::new(1000, 0)).await;
    h.engine.run().await;

    // Same update-ts as the watermark, arriving after the commit
    h.source.insert([row(1010, 4)]);
    let report = h.engine.run().await;

    assert_eq!(report.rows_emitted, 0);
    assert_eq!(h.watermark().await, Watermark::new(1010, 1));
}

#[test_case(Watermark::new(2000, 0) ; "forward")]
#[test_case(Watermark::new(500, 0) ; "backward")]
#[tokio::test]
async fn test_reseed_moves_next_query(reseed: Watermark) {
    let h = Harness::new(
        vec![row(600, 0), row(1005, 0), row(2500, 1)],
        Watermark::new(1000, 0),
    )
    .await;
    h.engine.run().await;
    assert_eq!(h.watermark().await, Watermark::new(2500, 1));

    h.engine
        .store()
        .seed(reseed.update_ts, reseed.partition)
        .await
        .unwrap();
    h.engine.run().await;

    let queries = h.source.executed_queries();
    let last = queries.last().unwrap();
    assert_eq!(last.params[0], reseed.update_ts);
    assert_eq!(h.watermark().await, Watermark::new(2500, 1));
}

#[tokio::test]
async fn test_reseed_back_replays_rows() {
    let h = Harness::new(vec![row(1005, 0), row(1010, 1)], Watermark::new(1000, 0)).await;
    h.engine.run().await;

    h.engine.store().seed(1000, 0).await.unwrap();
    let report = h.engine.run().await;

    assert_eq!(report.rows_emitted, 2);
    assert_eq!(h.emitted().len(), 4);
}

#[tokio::test]
async fn test_failure_mid_scan_is_retried_idempotently() {
    let rows = vec![row(1001, 0), row(1002, 0), row(1003, 0), row(1004, 0), row(1005, 0)];
    let h = Harness::new(rows, Watermark::new(1000, 0)).await;
    h.source.fail_next_scan_after(2, "connection reset by peer");

    let failed = h.engine.run().await;

    assert!(failed.is_failed());
    assert!(matches!(
        failed.outcome,
        PollOutcome::Failed {
            retryable: true,
            ..
        }
    ));
    assert_eq!(failed.rows_emitted, 2);
    assert!(failed.committed.is_none());
    assert_eq!(h.watermark().await, Watermark::new(1000, 0));

    let retried = h.engine.run().await;

    assert!(retried.is_completed());
    assert_eq!(retried.rows_emitted, 5);
    assert_eq!(h.watermark().await, Watermark::new(1005, 0));

    let queries = h.source.executed_queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0], queries[1]);

    // The two rows forwarded before the failure are delivered again
    assert_eq!(h.emitted().len(), 7);
}

#[tokio::test]
async fn test_sink_failure_aborts_without_commit() {
    let h = Harness::new(vec![row(1001, 0), row(1002, 0), row(1003, 0)], Watermark::new(1000, 0)).await;
    h.sink.fail_after(1);

    let report = h.engine.run().await;

    assert!(report.is_failed());
    assert_eq!(report.rows_emitted, 1);
    assert_eq!(h.watermark().await, Watermark::new(1000, 0));

    let retried = h.engine.run().await;
    assert!(retried.is_completed());
    assert_eq!(h.watermark().await, Watermark::new(1003, 0));
}

#[tokio::test]
async fn test_commit_failure_leaves_watermark() {
    let h = Harness::new(vec![row(1001, 0)], Watermark::new(1000, 0)).await;
    h.storage.fail_next_save();

    let report = h.engine.run().await;

    assert!(report.is_failed());
    assert_eq!(h.watermark().await, Watermark::new(1000, 0));
    let stored = h.storage.load("db.table").await.unwrap().unwrap();
    assert_eq!(stored.watermark, Watermark::new(1000, 0));
}

#[tokio::test]
async fn test_update_end_point_closes_axis() {
    let h = Harness::new(
        vec![row(1005, 0), row(1500, 1), row(1600, 0)],
        Watermark::new(1000, 0),
    )
    .await;
    h.engine
        .store()
        .set_end_point(Axis::UpdateTs, 1500)
        .await
        .unwrap();

    let first = h.engine.run().await;

    assert_eq!(first.rows_emitted, 2);
    assert_eq!(h.watermark().await, Watermark::new(1500, 1));
    assert_eq!(first.closed_axes, vec![Axis::UpdateTs]);

    h.source.insert([row(1501, 0), row(1700, 3)]);
    let second = h.engine.run().await;

    assert!(second.is_completed());
    assert!(!second.queried);
    assert_eq!(second.rows_emitted, 0);
    assert_eq!(h.watermark().await, Watermark::new(1500, 1));
    assert_eq!(h.source.executed_queries().len(), 1);
}

#[tokio::test]
async fn test_clearing_end_point_resumes_reads() {
    let h = Harness::new(vec![row(1500, 0), row(1600, 0)], Watermark::new(1000, 0)).await;
    h.engine
        .store()
        .set_end_point(Axis::UpdateTs, 1500)
        .await
        .unwrap();
    h.engine.run().await;
    assert_eq!(h.watermark().await, Watermark::new(1500, 0));

    h.engine
        .store()
        .clear_end_point(Axis::UpdateTs)
        .await
        .unwrap();
    let report = h.engine.run().await;

    assert_eq!(report.rows_emitted, 1);
    assert_eq!(h.watermark().await, Watermark::new(1600, 0));
}

#[tokio::test]
async fn test_end_points_use_independent_parameter_slots() {
    let h = Harness::new(
        vec![row(1001, 2), row(1002, 9), row(3000, 1)],
        Watermark::new(1000, 0),
    )
    .await;
    h.engine
        .store()
        .set_end_point(Axis::Partition, 5)
        .await
        .unwrap();
    h.engine
        .store()
        .set_end_point(Axis::UpdateTs, 2000)
        .await
        .unwrap();

    let report = h.engine.run().await;

    let query = &h.source.executed_queries()[0];
    assert_eq!(query.params, vec![1000, 0, 5, 2000]);
    assert!(query.sql.contains("\"partition_ts\" <= $3::BIGINT"));
    assert!(query.sql.contains("\"update_ts\" <= $4::BIGINT"));
    assert_eq!(report.rows_emitted, 1);
    assert_eq!(h.emitted(), vec![(1001, 2)]);
}

#[tokio::test]
async fn test_invalid_end_point_is_rejected_and_polling_continues() {
    let h = Harness::new(vec![row(1001, 0)], Watermark::new(1000, 0)).await;
    let before = h.engine.store().snapshot().await;

    let err = h
        .engine
        .store()
        .set_end_point(Axis::UpdateTs, 500)
        .await
        .unwrap_err();

    assert!(matches!(err, TidemarkError::InvalidRange { .. }));
    assert_eq!(h.engine.store().snapshot().await, before);

    let report = h.engine.run().await;
    assert!(report.is_completed());
    assert_eq!(report.rows_emitted, 1);
}

#[tokio::test]
async fn test_operator_change_from_another_process_is_picked_up() {
    let h = Harness::new(vec![row(1001, 0), row(5001, 0)], Watermark::new(1000, 0)).await;

    // A second store over the same storage stands in for the operator CLI
    let operator = WatermarkStore::open("db.table", h.storage.clone(), &seed_options(Watermark::zero()))
        .await
        .unwrap();
    operator.seed(5000, 0).await.unwrap();

    let report = h.engine.run().await;

    assert!(report.is_completed());
    assert_eq!(report.previous, Some(Watermark::new(5000, 0)));
    assert_eq!(h.emitted(), vec![(5001, 0)]);
    assert_eq!(h.watermark().await, Watermark::new(5001, 0));
}

#[tokio::test]
async fn test_channel_sink_receives_rows_in_order() {
    let (sink, mut rx) = ChannelSink::bounded(16);
    let source = Arc::new(InMemorySource::new(vec![row(1002, 0), row(1001, 1)]));
    let store = WatermarkStore::open(
        "db.table",
        Arc::new(InMemoryStateStorage::new()),
        &seed_options(Watermark::new(1000, 0)),
    )
    .await
    .unwrap();
    let engine = PollEngine::new(spec(), source, Arc::new(sink), Arc::new(store));

    let report = engine.run().await;
    drop(engine);

    assert_eq!(report.rows_emitted, 2);
    assert_eq!(rx.recv().await.unwrap().update_ts, 1002);
    assert_eq!(rx.recv().await.unwrap().update_ts, 1001);
    assert!(rx.recv().await.is_none());
}
