//! Domain models and types for tidemark.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Validated SQL identifiers** ([`TableName`], [`ColumnName`])
//! - **Watermark axes** ([`Axis`])
//! - **Source rows** ([`SourceRow`])
//! - **Error types** ([`TidemarkError`]), the [`Result`] alias and the
//!   [`context::ResultExt`] extension
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TidemarkError>`]:
//!
//! ```rust
//! use tidemark::domain::{ColumnName, Result, TidemarkError};
//!
//! fn column(name: &str) -> Result<ColumnName> {
//!     ColumnName::new(name).map_err(TidemarkError::Validation)
//! }
//!
//! assert!(column("update_ts").is_ok());
//! ```

pub mod axis;
pub mod context;
pub mod errors;
pub mod ids;
pub mod result;
pub mod row;

pub use axis::Axis;
pub use errors::TidemarkError;
pub use ids::{ColumnName, TableName};
pub use result::Result;
pub use row::SourceRow;
