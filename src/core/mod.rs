//! Core capture logic for tidemark.
//!
//! # Modules
//!
//! - [`state`] - Watermark model and the single-writer watermark store
//! - [`poll`] - Query construction, the poll engine and its scheduler
//!
//! # Poll Workflow
//!
//! Each scheduled invocation:
//!
//! 1. **Lease**: Lock the watermark store and refresh it from storage
//! 2. **Query**: Build `update_ts > ? AND partition >= ?` plus active end points
//! 3. **Scan**: Stream rows to the sink in arrival order, tracking the candidate watermark
//! 4. **Commit**: Persist the candidate once the result set is exhausted
//!
//! A failure anywhere before step 4 completes leaves the watermark untouched.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidemark::adapters::memory::{InMemorySource, InMemoryStateStorage};
//! use tidemark::adapters::sink::MemorySink;
//! use tidemark::core::poll::{PollEngine, Projection, QuerySpec};
//! use tidemark::core::state::{SeedOptions, WatermarkStore};
//! use tidemark::domain::{ColumnName, TableName};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = QuerySpec::new(
//!     TableName::new("db.orders")?,
//!     ColumnName::new("update_ts")?,
//!     ColumnName::new("partition_ts")?,
//!     Projection::All,
//! )?;
//! let storage = Arc::new(InMemoryStateStorage::new());
//! let store = Arc::new(WatermarkStore::open("db.orders", storage, &SeedOptions::default()).await?);
//! let engine = PollEngine::new(
//!     spec,
//!     Arc::new(InMemorySource::new(vec![])),
//!     Arc::new(MemorySink::new()),
//!     store,
//! );
//!
//! let report = engine.run().await;
//! println!("Emitted {} rows", report.rows_emitted);
//! # Ok(())
//! # }
//! ```

pub mod poll;
pub mod state;
