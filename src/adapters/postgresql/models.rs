//! PostgreSQL state models
//!
//! Row shape of the watermark state table and its mapping to the domain
//! [`WatermarkState`].

use crate::core::state::watermark::{EndPoint, Watermark, WatermarkState};
use crate::domain::{Result, TidemarkError};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

/// One row of the state table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgreSQLStateRow {
    /// Stream name (primary key)
    pub stream: String,

    /// Watermark update timestamp
    pub update_ts: i64,

    /// Watermark partition
    pub partition_value: i64,

    /// Update-ts end point bound
    pub update_end: i64,

    /// Whether the update-ts end point is active
    pub update_end_active: bool,

    /// Partition end point bound
    pub partition_end: i64,

    /// Whether the partition end point is active
    pub partition_end_active: bool,

    /// Write counter
    pub version: i64,

    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

impl PostgreSQLStateRow {
    /// Read a state row returned by `SELECT *`
    ///
    /// # Errors
    ///
    /// Returns a database error if a column is missing or has the wrong type.
    pub fn from_row(row: &Row) -> Result<Self> {
        let get_err = |e: tokio_postgres::Error| {
            TidemarkError::Database(format!("Malformed state row: {}", e))
        };

        Ok(Self {
            stream: row.try_get("stream").map_err(get_err)?,
            update_ts: row.try_get("update_ts").map_err(get_err)?,
            partition_value: row.try_get("partition_value").map_err(get_err)?,
            update_end: row.try_get("update_end").map_err(get_err)?,
            update_end_active: row.try_get("update_end_active").map_err(get_err)?,
            partition_end: row.try_get("partition_end").map_err(get_err)?,
            partition_end_active: row.try_get("partition_end_active").map_err(get_err)?,
            version: row.try_get("version").map_err(get_err)?,
            updated_at: row.try_get("updated_at").map_err(get_err)?,
        })
    }

    /// Convert from the domain state
    ///
    /// # Errors
    ///
    /// Returns a state error if the version does not fit a BIGINT.
    pub fn from_domain(state: &WatermarkState) -> Result<Self> {
        Ok(Self {
            stream: state.stream.clone(),
            update_ts: state.watermark.update_ts,
            partition_value: state.watermark.partition,
            update_end: state.update_end.bound,
            update_end_active: state.update_end.active,
            partition_end: state.partition_end.bound,
            partition_end_active: state.partition_end.active,
            version: to_db_version(state.version)?,
            updated_at: state.updated_at,
        })
    }

    /// Convert to the domain state
    ///
    /// # Errors
    ///
    /// Returns a state error for a negative version.
    pub fn to_domain(&self) -> Result<WatermarkState> {
        let version = u64::try_from(self.version).map_err(|_| {
            TidemarkError::State(format!(
                "Stream '{}' has invalid stored version {}",
                self.stream, self.version
            ))
        })?;

        Ok(WatermarkState {
            stream: self.stream.clone(),
            watermark: Watermark::new(self.update_ts, self.partition_value),
            update_end: EndPoint {
                bound: self.update_end,
                active: self.update_end_active,
            },
            partition_end: EndPoint {
                bound: self.partition_end,
                active: self.partition_end_active,
            },
            version,
            updated_at: self.updated_at,
        })
    }
}

/// Convert a domain version to its BIGINT column value
///
/// # Errors
///
/// Returns a state error if the version exceeds `i64::MAX`.
pub fn to_db_version(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| TidemarkError::State(format!("Version {} overflows BIGINT", version)))
}
