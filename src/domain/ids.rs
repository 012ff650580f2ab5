//! SQL identifier types with validation
//!
//! Table and column names end up interpolated into generated SQL, so they are
//! wrapped in newtypes that only admit plain identifiers and know how to
//! quote themselves.
//!
//! Names follow PostgreSQL's folding rules: an unquoted name is folded to
//! lower case, so `UPDATE_TS` finds a column created as `update_ts`. A name
//! written in double quotes (`"UpdateTs"`) keeps its case and must match the
//! catalog exactly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn identifier_pattern() -> Result<&'static Regex, String> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$"))
        .as_ref()
        .map_err(|e| format!("identifier pattern: {e}"))
}

fn validate_part(kind: &str, part: &str) -> Result<(), String> {
    if part.trim().is_empty() {
        return Err(format!("{kind} cannot be empty"));
    }
    if part.len() > 63 {
        return Err(format!(
            "{kind} '{part}' exceeds the 63 character identifier limit"
        ));
    }
    if !identifier_pattern()?.is_match(part) {
        return Err(format!(
            "{kind} '{part}' is not a valid identifier (letters, digits, '_' and '$' only)"
        ));
    }
    Ok(())
}

/// Catalog form of one name part
fn normalize_part(kind: &str, part: &str) -> Result<String, String> {
    match part.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(exact) => {
            validate_part(kind, exact)?;
            Ok(exact.to_string())
        }
        None => {
            validate_part(kind, part)?;
            Ok(part.to_ascii_lowercase())
        }
    }
}

/// How a catalog name is written back into configuration
fn config_form(part: &str) -> String {
    if part.bytes().any(|b| b.is_ascii_uppercase()) {
        quote(part)
    } else {
        part.to_string()
    }
}

fn quote(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

/// Column name newtype wrapper
///
/// # Examples
///
/// ```
/// use tidemark::domain::ids::ColumnName;
/// use std::str::FromStr;
///
/// let column = ColumnName::from_str("UPDATE_TS").unwrap();
/// assert_eq!(column.quoted(), "\"update_ts\"");
/// let exact = ColumnName::from_str("\"UpdateTs\"").unwrap();
/// assert_eq!(exact.quoted(), "\"UpdateTs\"");
/// assert!(ColumnName::from_str("update_ts; DROP TABLE x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnName(String);

impl ColumnName {
    /// Creates a new ColumnName, rejecting anything that is not a plain identifier
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        normalize_part("Column name", &name.into()).map(Self)
    }

    /// Returns the column name as the catalog stores it
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL
    pub fn quoted(&self) -> String {
        quote(&self.0)
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ColumnName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ColumnName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ColumnName> for String {
    fn from(value: ColumnName) -> Self {
        config_form(&value.0)
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Table name newtype wrapper
///
/// Accepts an optionally schema-qualified name such as `sales.orders`.
///
/// # Examples
///
/// ```
/// use tidemark::domain::ids::TableName;
/// use std::str::FromStr;
///
/// let table = TableName::from_str("sales.orders").unwrap();
/// assert_eq!(table.quoted(), "\"sales\".\"orders\"");
/// assert_eq!(table.unqualified(), "orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a new TableName
    ///
    /// # Returns
    ///
    /// Returns `Err` when the name is empty, has more than two parts or any
    /// part is not a plain identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Table name cannot be empty".to_string());
        }
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 {
            return Err(format!(
                "Invalid table name '{name}'. Expected format: table or schema.table"
            ));
        }
        let parts = parts
            .into_iter()
            .map(|part| normalize_part("Table name part", part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(parts.join(".")))
    }

    /// Returns the table name as the catalog stores it
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table name without its schema qualifier
    pub fn unqualified(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Schema qualifier, if any
    pub fn schema(&self) -> Option<&str> {
        self.0.split_once('.').map(|(schema, _)| schema)
    }

    /// Double-quoted form for SQL, each part quoted separately
    pub fn quoted(&self) -> String {
        self.0.split('.').map(quote).collect::<Vec<_>>().join(".")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0.split('.').map(config_form).collect::<Vec<_>>().join(".")
    }
}
