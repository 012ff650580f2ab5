//! PostgreSQL state storage
//!
//! Persists one row per stream in the state table. Writes are conditional
//! on the stored `version`, so two writers racing on the same stream cannot
//! silently overwrite each other.

use crate::adapters::database::traits::StateStorage;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{to_db_version, PostgreSQLStateRow};
use crate::core::state::watermark::WatermarkState;
use crate::domain::{Result, TableName, TidemarkError};
use async_trait::async_trait;
use std::sync::Arc;

const MIGRATION: &str = include_str!("../../../migrations/001_watermark_state.sql");

/// PostgreSQL implementation of [`StateStorage`]
pub struct PostgreSQLStateStorage {
    client: Arc<PostgreSQLClient>,
    table: TableName,
}

impl PostgreSQLStateStorage {
    /// Create a new state storage over an existing client
    pub fn new(client: Arc<PostgreSQLClient>, table: TableName) -> Self {
        Self { client, table }
    }

    /// Create the state table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the migration fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.client.get_connection().await?;

        client
            .batch_execute(&migration_sql(&self.table))
            .await
            .map_err(|e| TidemarkError::Database(format!("Failed to execute migration: {}", e)))?;

        tracing::info!(table = %self.table, "PostgreSQL state table ready");
        Ok(())
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (stream, update_ts, partition_value, update_end, update_end_active, \
             partition_end, partition_end_active, version, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (stream) DO NOTHING",
            self.table.quoted()
        )
    }

    fn update_sql(&self) -> String {
        format!(
            "UPDATE {} SET update_ts = $2, partition_value = $3, update_end = $4, \
             update_end_active = $5, partition_end = $6, partition_end_active = $7, \
             version = $8, updated_at = $9 \
             WHERE stream = $1 AND version = $10",
            self.table.quoted()
        )
    }

    async fn stored_version(&self, stream: &str) -> Result<u64> {
        Ok(self.load(stream).await?.map_or(0, |state| state.version))
    }
}

fn migration_sql(table: &TableName) -> String {
    MIGRATION.replace("{state_table}", &table.quoted())
}

#[async_trait]
impl StateStorage for PostgreSQLStateStorage {
    async fn load(&self, stream: &str) -> Result<Option<WatermarkState>> {
        let client = self.client.get_connection().await?;
        let query = format!("SELECT * FROM {} WHERE stream = $1", self.table.quoted());

        let row = client
            .query_opt(&query, &[&stream])
            .await
            .map_err(|e| TidemarkError::Database(format!("Failed to load state: {}", e)))?;

        match row {
            Some(row) => {
                let state = PostgreSQLStateRow::from_row(&row)?.to_domain()?;
                tracing::debug!(
                    stream = %stream,
                    watermark = %state.watermark,
                    version = state.version,
                    "State loaded from PostgreSQL"
                );
                Ok(Some(state))
            }
            None => {
                tracing::debug!(stream = %stream, "No state found in PostgreSQL");
                Ok(None)
            }
        }
    }

    async fn save(&self, state: &WatermarkState, expected_version: u64) -> Result<()> {
        let row = PostgreSQLStateRow::from_domain(state)?;
        let client = self.client.get_connection().await?;

        let result = if expected_version == 0 {
            client
                .execute(
                    &self.insert_sql(),
                    &[
                        &row.stream,
                        &row.update_ts,
                        &row.partition_value,
                        &row.update_end,
                        &row.update_end_active,
                        &row.partition_end,
                        &row.partition_end_active,
                        &row.version,
                        &row.updated_at,
                    ],
                )
                .await
        } else {
            let expected = to_db_version(expected_version)?;
            client
                .execute(
                    &self.update_sql(),
                    &[
                        &row.stream,
                        &row.update_ts,
                        &row.partition_value,
                        &row.update_end,
                        &row.update_end_active,
                        &row.partition_end,
                        &row.partition_end_active,
                        &row.version,
                        &row.updated_at,
                        &expected,
                    ],
                )
                .await
        };
        let affected =
            result.map_err(|e| TidemarkError::Database(format!("Failed to save state: {}", e)))?;
        drop(client);

        if affected == 0 {
            return Err(TidemarkError::StateConflict {
                stream: state.stream.clone(),
                expected: expected_version,
                found: self.stored_version(&state.stream).await?,
            });
        }

        tracing::debug!(
            stream = %state.stream,
            watermark = %state.watermark,
            version = state.version,
            "State saved to PostgreSQL"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WatermarkState>> {
        let client = self.client.get_connection().await?;
        let query = format!("SELECT * FROM {} ORDER BY stream", self.table.quoted());

        let rows = client
            .query(&query, &[])
            .await
            .map_err(|e| TidemarkError::Database(format!("Failed to list state: {}", e)))?;

        rows.iter()
            .map(|row| PostgreSQLStateRow::from_row(row)?.to_domain())
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}
