//! Error context extension trait
//!
//! `.context()` / `.with_context()` for `Result<T, E: Into<TidemarkError>>`,
//! in the spirit of `anyhow::Context`. Unlike anyhow the variant is kept, so
//! [`TidemarkError::is_retryable`] still answers for the underlying failure.
//!
//! # Examples
//!
//! ```rust
//! use tidemark::domain::Result;
//! use tidemark::domain::context::ResultExt;
//!
//! fn read_file(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! ```

use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use std::fmt::Display;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Prefix the error message with `context`
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display;

    /// Prefix the error message with a lazily built context
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<TidemarkError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display,
    {
        self.map_err(|e| e.into().prefixed(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().prefixed(f()))
    }
}

impl TidemarkError {
    /// Same error with `context` prepended to its message
    ///
    /// Structured variants carry no free-form message and are returned as-is.
    pub fn prefixed(self, context: impl Display) -> Self {
        let wrap = |message: String| format!("{context}: {message}");
        match self {
            TidemarkError::Configuration(m) => TidemarkError::Configuration(wrap(m)),
            TidemarkError::QueryExecution(m) => TidemarkError::QueryExecution(wrap(m)),
            TidemarkError::Connection(m) => TidemarkError::Connection(wrap(m)),
            TidemarkError::Database(m) => TidemarkError::Database(wrap(m)),
            TidemarkError::State(m) => TidemarkError::State(wrap(m)),
            TidemarkError::Sink(m) => TidemarkError::Sink(wrap(m)),
            TidemarkError::Validation(m) => TidemarkError::Validation(wrap(m)),
            TidemarkError::Serialization(m) => TidemarkError::Serialization(wrap(m)),
            TidemarkError::Io(m) => TidemarkError::Io(wrap(m)),
            TidemarkError::Other(m) => TidemarkError::Other(wrap(m)),
            structured @ (TidemarkError::InvalidRange { .. }
            | TidemarkError::StateConflict { .. }) => structured,
        }
    }
}
