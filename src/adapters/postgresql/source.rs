//! PostgreSQL source table
//!
//! Streams the result set of a range query row by row. The cursor keeps its
//! pooled connection checked out until it is dropped.

use crate::adapters::database::traits::{RowCursor, SourceTable};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::decode::{decode_column, decode_key, RawColumn};
use crate::core::poll::query::RangeQuery;
use crate::domain::{ColumnName, Result, SourceRow, TidemarkError};
use async_trait::async_trait;
use deadpool_postgres::Object;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::pin::Pin;
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Row, RowStream};

/// PostgreSQL implementation of [`SourceTable`]
pub struct PostgreSQLSource {
    client: Arc<PostgreSQLClient>,
    update_column: ColumnName,
    partition_column: ColumnName,
}

impl PostgreSQLSource {
    /// Create a source reading the given watermark columns
    pub fn new(
        client: Arc<PostgreSQLClient>,
        update_column: ColumnName,
        partition_column: ColumnName,
    ) -> Self {
        Self {
            client,
            update_column,
            partition_column,
        }
    }
}

#[async_trait]
impl SourceTable for PostgreSQLSource {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn open(&self, query: &RangeQuery) -> Result<Box<dyn RowCursor>> {
        let connection = self.client.get_connection().await.map_err(during_poll)?;

        let params = query.params.iter().map(|p| p as &(dyn ToSql + Sync));
        let stream = connection
            .query_raw(query.sql.as_str(), params)
            .await
            .map_err(|e| TidemarkError::QueryExecution(format!("Range query failed: {}", e)))?;

        Ok(Box::new(PostgreSQLCursor {
            stream: Box::pin(stream),
            _connection: connection,
            keys: None,
            update_column: self.update_column.clone(),
            partition_column: self.partition_column.clone(),
        }))
    }

    fn describe(&self) -> String {
        self.client.connection_string_safe().to_string()
    }
}

/// Positions of the watermark columns in the result set
#[derive(Debug, Clone, Copy)]
struct KeyColumns {
    update_ts: usize,
    partition: usize,
}

struct PostgreSQLCursor {
    stream: Pin<Box<RowStream>>,
    _connection: Object,
    keys: Option<KeyColumns>,
    update_column: ColumnName,
    partition_column: ColumnName,
}

impl PostgreSQLCursor {
    fn key_columns(&mut self, row: &Row) -> Result<KeyColumns> {
        if let Some(keys) = self.keys {
            return Ok(keys);
        }

        let position = |column: &ColumnName| {
            row.columns()
                .iter()
                .position(|c| c.name() == column.as_str())
                .ok_or_else(|| {
                    TidemarkError::QueryExecution(format!(
                        "Result set has no watermark column '{}'",
                        column
                    ))
                })
        };

        let keys = KeyColumns {
            update_ts: position(&self.update_column)?,
            partition: position(&self.partition_column)?,
        };
        self.keys = Some(keys);
        Ok(keys)
    }
}

#[async_trait]
impl RowCursor for PostgreSQLCursor {
    async fn next_row(&mut self) -> Result<Option<SourceRow>> {
        let row = match self.stream.next().await {
            None => return Ok(None),
            Some(row) => row.map_err(|e| {
                TidemarkError::QueryExecution(format!("Failed to read row: {}", e))
            })?,
        };

        let keys = self.key_columns(&row)?;
        Ok(Some(SourceRow {
            update_ts: key_value(&row, keys.update_ts)?,
            partition: key_value(&row, keys.partition)?,
            columns: row_to_json(&row)?,
        }))
    }
}

/// Raw bytes of one column, `None` for SQL NULL
fn raw_column(row: &Row, idx: usize) -> Result<Option<&[u8]>> {
    row.try_get::<_, Option<RawColumn>>(idx)
        .map(|raw| raw.map(|RawColumn(bytes)| bytes))
        .map_err(|e| TidemarkError::QueryExecution(format!("Failed to read column {}: {}", idx, e)))
}

fn key_value(row: &Row, idx: usize) -> Result<i64> {
    let column = &row.columns()[idx];
    decode_key(column.name(), column.type_(), raw_column(row, idx)?)
}

/// Convert every column of a row to JSON, in result-set order
fn row_to_json(row: &Row) -> Result<Map<String, Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| -> Result<(String, Value)> {
            let value = decode_column(column.name(), column.type_(), raw_column(row, idx)?)?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

/// A connection the poll cannot obtain is reported as a failed range query
fn during_poll(err: TidemarkError) -> TidemarkError {
    match err {
        TidemarkError::Connection(message) => TidemarkError::QueryExecution(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_failure_during_poll_is_query_failure() {
        let err = during_poll(TidemarkError::Connection(
            "Failed to get connection from pool: timed out".to_string(),
        ));

        assert!(matches!(err, TidemarkError::QueryExecution(_)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_other_errors_pass_through_during_poll() {
        let err = during_poll(TidemarkError::Configuration("bad".to_string()));
        assert!(matches!(err, TidemarkError::Configuration(_)));
    }
}
