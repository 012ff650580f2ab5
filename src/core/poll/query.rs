//! Range query construction
//!
//! Turns the current [`WatermarkState`] into the SQL range predicate for the
//! next poll. Each active end point gets its own parameter slot.

use crate::core::state::watermark::WatermarkState;
use crate::domain::{ColumnName, Result, TableName, TidemarkError};
use std::fmt::Write as _;

/// Columns selected by the poll query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `SELECT *`
    All,
    /// Explicit column list, in output order
    Columns(Vec<ColumnName>),
}

impl Projection {
    /// Build a projection from configured names, where `["*"]` means all columns
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty list or an invalid column name.
    pub fn from_names(names: &[String]) -> Result<Self> {
        match names {
            [] => Err(TidemarkError::Validation(
                "select_columns cannot be empty".to_string(),
            )),
            [only] if only.trim() == "*" => Ok(Projection::All),
            names => names
                .iter()
                .map(|name| ColumnName::new(name.trim()).map_err(TidemarkError::Validation))
                .collect::<Result<Vec<_>>>()
                .map(Projection::Columns),
        }
    }

    fn to_sql(&self) -> String {
        match self {
            Projection::All => "*".to_string(),
            Projection::Columns(columns) => columns
                .iter()
                .map(ColumnName::quoted)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn contains(&self, column: &ColumnName) -> bool {
        match self {
            Projection::All => true,
            Projection::Columns(columns) => columns.contains(column),
        }
    }
}

/// Static part of the poll query: what to read and from where
#[derive(Debug, Clone)]
pub struct QuerySpec {
    table: TableName,
    update_column: ColumnName,
    partition_column: ColumnName,
    projection: Projection,
}

impl QuerySpec {
    /// Create a query spec
    ///
    /// # Errors
    ///
    /// Returns a validation error if an explicit projection leaves out the
    /// update or partition column, since the scan needs both.
    pub fn new(
        table: TableName,
        update_column: ColumnName,
        partition_column: ColumnName,
        projection: Projection,
    ) -> Result<Self> {
        for key in [&update_column, &partition_column] {
            if !projection.contains(key) {
                return Err(TidemarkError::Validation(format!(
                    "select_columns must include the watermark column '{key}'"
                )));
            }
        }

        Ok(Self {
            table,
            update_column,
            partition_column,
            projection,
        })
    }

    /// Source table
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Update-timestamp column
    pub fn update_column(&self) -> &ColumnName {
        &self.update_column
    }

    /// Partition column
    pub fn partition_column(&self) -> &ColumnName {
        &self.partition_column
    }

    /// Build the range query for the given state
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::core::poll::query::{Projection, QuerySpec};
    /// use tidemark::core::state::{EndPoint, Watermark, WatermarkState};
    /// use tidemark::domain::{ColumnName, TableName};
    ///
    /// let spec = QuerySpec::new(
    ///     TableName::new("db.orders").unwrap(),
    ///     ColumnName::new("update_ts").unwrap(),
    ///     ColumnName::new("partition_ts").unwrap(),
    ///     Projection::All,
    /// )
    /// .unwrap();
    ///
    /// let mut state = WatermarkState::new("db.orders", Watermark::new(1000, 0));
    /// state.update_end = EndPoint::active(2000);
    ///
    /// let query = spec.build(&state);
    /// assert_eq!(
    ///     query.sql,
    ///     "SELECT * FROM \"db\".\"orders\" WHERE \"update_ts\" > $1::BIGINT \
    ///      AND \"partition_ts\" >= $2::BIGINT AND \"update_ts\" <= $3::BIGINT"
    /// );
    /// assert_eq!(query.params, vec![1000, 0, 2000]);
    /// ```
    pub fn build(&self, state: &WatermarkState) -> RangeQuery {
        let bounds = RangeBounds::from_state(state);
        let update = self.update_column.quoted();
        let partition = self.partition_column.quoted();

        let mut sql = format!(
            "SELECT {} FROM {} WHERE {update} > $1::BIGINT AND {partition} >= $2::BIGINT",
            self.projection.to_sql(),
            self.table.quoted(),
        );
        let mut params = vec![bounds.after_update_ts, bounds.from_partition];

        if let Some(to_partition) = bounds.to_partition {
            params.push(to_partition);
            let _ = write!(sql, " AND {partition} <= ${}::BIGINT", params.len());
        }
        if let Some(to_update_ts) = bounds.to_update_ts {
            params.push(to_update_ts);
            let _ = write!(sql, " AND {update} <= ${}::BIGINT", params.len());
        }

        RangeQuery {
            sql,
            params,
            bounds,
        }
    }
}

/// Numeric bounds of one poll query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    /// Exclusive lower bound on update-ts
    pub after_update_ts: i64,

    /// Inclusive lower bound on partition
    pub from_partition: i64,

    /// Inclusive upper bound on partition, when its end point is active
    pub to_partition: Option<i64>,

    /// Inclusive upper bound on update-ts, when its end point is active
    pub to_update_ts: Option<i64>,
}

impl RangeBounds {
    /// Bounds for the state's watermark and active end points
    pub fn from_state(state: &WatermarkState) -> Self {
        Self {
            after_update_ts: state.watermark.update_ts,
            from_partition: state.watermark.partition,
            to_partition: state.partition_end.bound(),
            to_update_ts: state.update_end.bound(),
        }
    }

    /// Whether a row with this key falls inside the range
    pub fn contains(&self, update_ts: i64, partition: i64) -> bool {
        update_ts > self.after_update_ts
            && partition >= self.from_partition
            && self.to_partition.map_or(true, |end| partition <= end)
            && self.to_update_ts.map_or(true, |end| update_ts <= end)
    }

    /// Whether no row can possibly match
    pub fn is_empty(&self) -> bool {
        self.to_update_ts
            .is_some_and(|end| end <= self.after_update_ts)
            || self
                .to_partition
                .is_some_and(|end| end < self.from_partition)
    }
}

/// A ready-to-execute poll query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Parameterized SQL with `$n` placeholders
    pub sql: String,

    /// Parameter values, `$1` first
    pub params: Vec<i64>,

    /// The same bounds in structured form
    pub bounds: RangeBounds,
}
