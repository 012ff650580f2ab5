//! Row sinks
//!
//! A sink is the downstream consumer of every row a poll reads. The engine
//! sends rows one at a time in result-set order and calls [`RowSink::flush`]
//! once the result set is exhausted, before committing the watermark.
//!
//! Delivery is at-least-once: a poll that fails after forwarding some rows
//! leaves the watermark where it was, so the same rows are sent again on the
//! next poll.

pub mod channel;
pub mod json_lines;
pub mod memory;

use crate::domain::{Result, SourceRow};
use async_trait::async_trait;

pub use channel::ChannelSink;
pub use json_lines::JsonLinesSink;
pub use memory::MemorySink;

/// Downstream consumer of polled rows
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Forward one row
    ///
    /// # Errors
    ///
    /// Returns [`TidemarkError::Sink`](crate::domain::TidemarkError::Sink) if the row
    /// cannot be delivered. The engine aborts the poll without committing.
    async fn send(&self, row: &SourceRow) -> Result<()>;

    /// Make every row sent so far durable downstream
    ///
    /// # Errors
    ///
    /// Returns an error if buffered rows cannot be written out.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
