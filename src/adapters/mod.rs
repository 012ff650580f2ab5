//! External system integrations for Tidemark.
//!
//! - [`database`] - Source and state traits plus the configuration factory
//! - [`postgresql`] - PostgreSQL source table and state storage
//! - [`memory`] - In-process source and state storage
//! - [`sink`] - Downstream row sinks
//!
//! The engine only sees trait objects, so a poll can run against the
//! in-memory adapters exactly as it runs against PostgreSQL:
//!
//! ```rust
//! use std::sync::Arc;
//! use tidemark::adapters::database::{SourceTable, StateStorage};
//! use tidemark::adapters::memory::{InMemorySource, InMemoryStateStorage};
//! use tidemark::domain::SourceRow;
//!
//! let source: Arc<dyn SourceTable + Send + Sync> =
//!     Arc::new(InMemorySource::new(vec![SourceRow::new(1005, 0)]));
//! let state: Arc<dyn StateStorage + Send + Sync> = Arc::new(InMemoryStateStorage::new());
//! assert_eq!(source.describe(), "memory");
//! assert_eq!(state.backend_name(), "memory");
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
pub mod sink;
