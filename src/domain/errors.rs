//! Domain error types
//!
//! This module defines the error hierarchy for tidemark.
//! Errors are domain-specific and don't expose third-party driver types.

use crate::domain::Axis;
use thiserror::Error;

/// Main tidemark error type
///
/// This is the primary error type used throughout the application.
/// Poll-time variants are contained within a single invocation; only
/// [`TidemarkError::Configuration`] is fatal at startup.
#[derive(Debug, Error)]
pub enum TidemarkError {
    /// Configuration-related errors (unresolvable driver, bad connection setup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested end point is not ahead of the current start point
    #[error("Invalid range: {axis} end point {bound} must be greater than current value {current}")]
    InvalidRange {
        /// Axis the end point was requested for
        axis: Axis,
        /// Requested bound
        bound: i64,
        /// Current low-water value on that axis
        current: i64,
    },

    /// Connection or statement failure while polling the source table
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database-related errors outside of the poll query
    #[error("Database error: {0}")]
    Database(String),

    /// Persisted state changed underneath the writer
    #[error("State conflict for stream '{stream}': expected version {expected}, found {found}")]
    StateConflict {
        /// Stream name
        stream: String,
        /// Version the writer based its change on
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// State management errors
    #[error("State management error: {0}")]
    State(String),

    /// Sink delivery errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl TidemarkError {
    /// Whether the next scheduled poll may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TidemarkError::QueryExecution(_)
                | TidemarkError::Connection(_)
                | TidemarkError::Database(_)
                | TidemarkError::StateConflict { .. }
                | TidemarkError::Sink(_)
                | TidemarkError::Io(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for TidemarkError {
    fn from(err: std::io::Error) -> Self {
        TidemarkError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TidemarkError {
    fn from(err: serde_json::Error) -> Self {
        TidemarkError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TidemarkError {
    fn from(err: toml::de::Error) -> Self {
        TidemarkError::Configuration(format!("TOML parse error: {err}"))
    }
}
