//! Adapter factory
//!
//! This module provides factory functions to create the source, state
//! storage and sink based on configuration.

use crate::adapters::database::traits::{SourceTable, StateStorage};
use crate::adapters::memory::InMemoryStateStorage;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLSource, PostgreSQLStateStorage};
use crate::adapters::sink::{JsonLinesSink, RowSink};
use crate::config::schema::{SinkKind, SourceDriver, StateBackend, TidemarkConfig};
use crate::domain::{ColumnName, Result, TableName, TidemarkError};
use std::sync::Arc;

/// Source table and state storage built from one configuration
pub struct Adapters {
    /// Source table
    pub source: Arc<dyn SourceTable + Send + Sync>,

    /// State storage
    pub state: Arc<dyn StateStorage + Send + Sync>,
}

/// Create the source and state storage, sharing one connection pool
///
/// For the postgresql state backend the state table is created if missing.
///
/// # Errors
///
/// Returns an error if a client cannot be created or the state schema
/// cannot be initialized.
pub async fn create_adapters(config: &TidemarkConfig) -> Result<Adapters> {
    match config.source.driver {
        SourceDriver::PostgreSQL => {
            tracing::info!("Creating PostgreSQL client");
            let client = Arc::new(PostgreSQLClient::new(&config.source)?);

            let source = PostgreSQLSource::new(
                client.clone(),
                ColumnName::new(&config.source.update_column)
                    .map_err(TidemarkError::Configuration)?,
                ColumnName::new(&config.source.partition_column)
                    .map_err(TidemarkError::Configuration)?,
            );

            let state = create_state_storage(config, Some(client)).await?;
            Ok(Adapters {
                source: Arc::new(source) as Arc<dyn SourceTable + Send + Sync>,
                state,
            })
        }
    }
}

/// Create the state storage for the configured backend
///
/// # Arguments
///
/// * `config` - The Tidemark configuration
/// * `client` - Existing client to reuse for the postgresql backend
///
/// # Errors
///
/// Returns an error if the storage cannot be created
pub async fn create_state_storage(
    config: &TidemarkConfig,
    client: Option<Arc<PostgreSQLClient>>,
) -> Result<Arc<dyn StateStorage + Send + Sync>> {
    match config.state.backend {
        StateBackend::Memory => {
            tracing::info!("Using in-memory state storage, state is lost on exit");
            Ok(Arc::new(InMemoryStateStorage::new()) as Arc<dyn StateStorage + Send + Sync>)
        }
        StateBackend::PostgreSQL => {
            let client = match client {
                Some(client) => client,
                None => Arc::new(PostgreSQLClient::new(&config.source)?),
            };
            let table = TableName::new(&config.state.table).map_err(TidemarkError::Configuration)?;

            tracing::info!(table = %table, "Creating PostgreSQL state storage");
            let storage = PostgreSQLStateStorage::new(client, table);
            storage.ensure_schema().await?;

            Ok(Arc::new(storage) as Arc<dyn StateStorage + Send + Sync>)
        }
    }
}

/// Create the configured row sink
///
/// # Errors
///
/// Returns an error if the output file cannot be opened
pub async fn create_sink(config: &TidemarkConfig) -> Result<Arc<dyn RowSink + Send + Sync>> {
    match config.sink.kind {
        SinkKind::Stdout => Ok(Arc::new(JsonLinesSink::stdout()) as Arc<dyn RowSink + Send + Sync>),
        SinkKind::File => {
            let path = config.sink.path.as_deref().ok_or_else(|| {
                TidemarkError::Configuration("sink.path is required for the file sink".to_string())
            })?;
            tracing::info!(path = %path, "Writing rows to file");
            Ok(Arc::new(JsonLinesSink::append(path).await?) as Arc<dyn RowSink + Send + Sync>)
        }
    }
}
