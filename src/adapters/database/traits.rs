//! Database abstraction traits
//!
//! This module defines the traits that source and state adapters must
//! implement to work with the poll engine.

use crate::core::poll::query::RangeQuery;
use crate::core::state::watermark::WatermarkState;
use crate::domain::{Result, SourceRow};
use async_trait::async_trait;

/// Forward-only cursor over the rows of one poll query
///
/// Rows are yielded in the order the source returns them. A cursor owns
/// whatever connection it reads from for as long as it is alive.
#[async_trait]
pub trait RowCursor: Send {
    /// Next row, or `Ok(None)` once the result set is exhausted
    ///
    /// # Errors
    ///
    /// Returns [`TidemarkError::QueryExecution`](crate::domain::TidemarkError::QueryExecution)
    /// when reading from the source fails mid-scan.
    async fn next_row(&mut self) -> Result<Option<SourceRow>>;
}

/// Source table the poll engine reads from
#[async_trait]
pub trait SourceTable: Send + Sync {
    /// Test the source connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Execute a range query and return a cursor over its result set
    ///
    /// # Arguments
    ///
    /// * `query` - Range query built from the current watermark state
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be acquired or the statement fails.
    async fn open(&self, query: &RangeQuery) -> Result<Box<dyn RowCursor>>;

    /// Human readable description of the source, safe to log
    fn describe(&self) -> String;
}

/// State storage trait for watermark persistence
///
/// Implementations must make `save` a compare-and-set on
/// [`WatermarkState::version`]: the write only succeeds when the stored
/// version equals `expected_version` (0 meaning "nothing stored yet").
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the state of a stream
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(state))` if found, `Ok(None)` if the stream has never been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails for reasons other than "not found".
    async fn load(&self, stream: &str) -> Result<Option<WatermarkState>>;

    /// Save the state of a stream
    ///
    /// # Arguments
    ///
    /// * `state` - State to store, already carrying its new version
    /// * `expected_version` - Version the caller read before changing the state
    ///
    /// # Errors
    ///
    /// Returns [`TidemarkError::StateConflict`](crate::domain::TidemarkError::StateConflict)
    /// if the stored version differs from `expected_version`.
    async fn save(&self, state: &WatermarkState, expected_version: u64) -> Result<()>;

    /// List every stored stream state
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn list(&self) -> Result<Vec<WatermarkState>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
