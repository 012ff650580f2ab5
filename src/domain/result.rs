//! Crate-wide `Result` alias

use super::errors::TidemarkError;

/// `Result` with [`TidemarkError`] as the error type
///
/// ```
/// use tidemark::domain::{Result, TidemarkError};
///
/// fn parse_partition(raw: &str) -> Result<i64> {
///     raw.parse()
///         .map_err(|_| TidemarkError::Validation(format!("not a partition: {raw}")))
/// }
///
/// assert_eq!(parse_partition("7").unwrap(), 7);
/// assert!(parse_partition("seven").is_err());
/// ```
pub type Result<T> = std::result::Result<T, TidemarkError>;
