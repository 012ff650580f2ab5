//! Integration tests for scheduling and graceful shutdown
//!
//! These tests verify that:
//! - A shutdown signal during the inter-poll wait stops the scheduler promptly
//! - A poll already scanning when shutdown arrives still commits
//! - Dropping the shutdown sender ends the loop
//! - Failed polls do not stop the scheduler
//! - Overlapping invocations are skipped, never run concurrently

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tidemark::adapters::memory::{InMemorySource, InMemoryStateStorage};
use tidemark::adapters::sink::{MemorySink, RowSink};
use tidemark::core::poll::{
    PollEngine, PollOutcome, PollScheduler, Projection, QuerySpec, ScheduleSettings,
};
use tidemark::core::state::{SeedOptions, Watermark, WatermarkStore};
use tidemark::domain::{ColumnName, Result, SourceRow, TableName};
use tokio::sync::watch;

/// Sink that takes a while per row, to keep a poll in flight
struct SlowSink {
    per_row: Duration,
    inner: MemorySink,
}

#[async_trait]
impl RowSink for SlowSink {
    async fn send(&self, row: &SourceRow) -> Result<()> {
        tokio::time::sleep(self.per_row).await;
        self.inner.send(row).await
    }
}

fn row(update_ts: i64, partition: i64) -> SourceRow {
    SourceRow::new(update_ts, partition)
        .with_column("update_ts", json!(update_ts))
        .with_column("partition_ts", json!(partition))
}

async fn engine_with(
    source: Arc<InMemorySource>,
    sink: Arc<dyn RowSink + Send + Sync>,
) -> Arc<PollEngine> {
    let spec = QuerySpec::new(
        TableName::new("db.table").unwrap(),
        ColumnName::new("update_ts").unwrap(),
        ColumnName::new("partition_ts").unwrap(),
        Projection::All,
    )
    .unwrap();
    let seed = SeedOptions {
        update_ts: Some(1000),
        partition: Some(0),
        resume: true,
    };
    let store = WatermarkStore::open("db.table", Arc::new(InMemoryStateStorage::new()), &seed)
        .await
        .unwrap();

    Arc::new(PollEngine::new(spec, source, sink, Arc::new(store)))
}

fn millis(initial_delay: u64, delay: u64) -> ScheduleSettings {
    ScheduleSettings {
        initial_delay: Duration::from_millis(initial_delay),
        delay: Duration::from_millis(delay),
    }
}

#[tokio::test]
async fn test_shutdown_during_wait_stops_promptly() {
    let engine = engine_with(
        Arc::new(InMemorySource::new(vec![])),
        Arc::new(MemorySink::new()),
    )
    .await;
    let scheduler = PollScheduler::new(engine, millis(60_000, 60_000));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.invocations, 0);
}

#[tokio::test]
async fn test_signal_already_set_prevents_first_poll() {
    let source = Arc::new(InMemorySource::new(vec![row(1001, 0)]));
    let engine = engine_with(source.clone(), Arc::new(MemorySink::new())).await;
    let scheduler = PollScheduler::new(engine, millis(0, 0));
    let (_shutdown_tx, shutdown_rx) = watch::channel(true);

    let summary = scheduler.run(shutdown_rx).await;

    assert!(summary.interrupted);
    assert_eq!(summary.invocations, 0);
    assert!(source.executed_queries().is_empty());
}

#[tokio::test]
async fn test_in_flight_poll_commits_before_shutdown() {
    let source = Arc::new(InMemorySource::new(vec![
        row(1001, 0),
        row(1002, 0),
        row(1003, 1),
    ]));
    let sink = Arc::new(SlowSink {
        per_row: Duration::from_millis(50),
        inner: MemorySink::new(),
    });
    let engine = engine_with(source, sink.clone()).await;
    let scheduler = PollScheduler::new(engine.clone(), millis(0, 60_000));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    // Signal while the first poll is still forwarding rows
    tokio::time::sleep(Duration::from_millis(60)).await;
    shutdown_tx.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.invocations, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.rows_emitted, 3);
    assert_eq!(sink.inner.rows().len(), 3);
    assert_eq!(engine.store().current().await, Watermark::new(1003, 1));
}

#[tokio::test]
async fn test_dropped_sender_ends_loop() {
    let engine = engine_with(
        Arc::new(InMemorySource::new(vec![])),
        Arc::new(MemorySink::new()),
    )
    .await;
    let scheduler = PollScheduler::new(engine, millis(60_000, 60_000));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    drop(shutdown_tx);

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(summary.interrupted);
}

#[tokio::test]
async fn test_failed_poll_keeps_scheduler_running() {
    let source = Arc::new(InMemorySource::new(vec![row(1001, 0)]));
    source.fail_next_open("connection refused");
    let sink = Arc::new(MemorySink::new());
    let engine = engine_with(source.clone(), sink.clone()).await;
    let scheduler = PollScheduler::new(engine.clone(), millis(0, 10));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown_tx.send(true).unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.failures, 1);
    assert!(summary.completed >= 1);
    assert_eq!(summary.rows_emitted, 1);
    assert_eq!(sink.rows().len(), 1);
    assert_eq!(engine.store().current().await, Watermark::new(1001, 0));
}

#[tokio::test]
async fn test_scheduler_repeats_with_fixed_delay() {
    let source = Arc::new(InMemorySource::new(vec![]));
    let engine = engine_with(source.clone(), Arc::new(MemorySink::new())).await;
    let scheduler = PollScheduler::new(engine, millis(0, 20));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    let summary = handle.await.unwrap();

    assert!(summary.invocations >= 2);
    assert_eq!(summary.invocations, summary.completed);
    assert_eq!(source.executed_queries().len() as u64, summary.invocations);
}

#[tokio::test]
async fn test_overlapping_invocation_is_skipped() {
    let source = Arc::new(InMemorySource::new(vec![row(1001, 0), row(1002, 0)]));
    let sink = Arc::new(SlowSink {
        per_row: Duration::from_millis(50),
        inner: MemorySink::new(),
    });
    let engine = engine_with(source.clone(), sink).await;

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = engine.run().await;
    let first = first.await.unwrap();

    assert_eq!(second.outcome, PollOutcome::Skipped);
    assert!(!second.queried);
    assert!(first.is_completed());
    assert_eq!(source.executed_queries().len(), 1);
    assert_eq!(engine.store().current().await, Watermark::new(1002, 0));
}
