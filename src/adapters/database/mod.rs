//! Database abstraction layer
//!
//! Traits the poll engine and watermark store are written against, and the
//! factory that builds their implementations from configuration.

pub mod factory;
pub mod traits;

pub use factory::{create_adapters, create_sink, create_state_storage, Adapters};
pub use traits::{RowCursor, SourceTable, StateStorage};
