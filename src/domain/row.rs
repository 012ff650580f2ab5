//! Source row model
//!
//! A [`SourceRow`] is one row returned by a poll query: its watermark key
//! `(update_ts, partition)` plus every selected column in projection order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row read from the source table
///
/// # Examples
///
/// ```
/// use tidemark::domain::SourceRow;
/// use serde_json::json;
///
/// let row = SourceRow::new(1005, 0)
///     .with_column("id", json!(42))
///     .with_column("status", json!("shipped"));
///
/// assert_eq!(row.update_ts, 1005);
/// assert_eq!(row.column("status"), Some(&json!("shipped")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Value of the update-timestamp column
    pub update_ts: i64,

    /// Value of the partition column
    pub partition: i64,

    /// All selected columns, in projection order
    pub columns: Map<String, Value>,
}

impl SourceRow {
    /// Creates a row with only its watermark key set
    pub fn new(update_ts: i64, partition: i64) -> Self {
        Self {
            update_ts,
            partition,
            columns: Map::new(),
        }
    }

    /// Adds a selected column
    pub fn with_column(mut self, name: impl Into<String>, value: Value) -> Self {
        self.columns.insert(name.into(), value);
        self
    }

    /// Looks up a selected column by name
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    /// The selected columns as a JSON object, the shape handed to sinks
    pub fn to_json(&self) -> Value {
        Value::Object(self.columns.clone())
    }
}
