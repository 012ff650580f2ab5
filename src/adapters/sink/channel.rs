//! Channel sink
//!
//! Hands rows to an in-process consumer over a bounded tokio channel. A
//! full channel applies backpressure to the poll; a closed one fails it.

use super::RowSink;
use crate::domain::{Result, SourceRow, TidemarkError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sink forwarding rows to an mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SourceRow>,
}

impl ChannelSink {
    /// Create a sink and the receiver that consumes it
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SourceRow>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Wrap an existing sender
    pub fn new(tx: mpsc::Sender<SourceRow>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl RowSink for ChannelSink {
    async fn send(&self, row: &SourceRow) -> Result<()> {
        self.tx
            .send(row.clone())
            .await
            .map_err(|_| TidemarkError::Sink("Row channel receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rows_arrive_in_order() {
        let (sink, mut rx) = ChannelSink::bounded(4);

        sink.send(&SourceRow::new(1, 0)).await.unwrap();
        sink.send(&SourceRow::new(2, 0)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().update_ts, 1);
        assert_eq!(rx.recv().await.unwrap().update_ts, 2);
    }

    #[tokio::test]
    async fn test_closed_receiver_fails_send() {
        let (sink, rx) = ChannelSink::bounded(1);
        drop(rx);

        let err = sink.send(&SourceRow::new(1, 0)).await.unwrap_err();
        assert!(matches!(err, TidemarkError::Sink(_)));
    }
}
