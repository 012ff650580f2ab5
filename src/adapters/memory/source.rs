//! In-memory source table
//!
//! Evaluates range queries against a vector of rows, returning matches in
//! insertion order. Faults can be injected to exercise the engine's
//! failure paths: a failing `open` or a scan that breaks after N rows.

use crate::adapters::database::traits::{RowCursor, SourceTable};
use crate::core::poll::query::RangeQuery;
use crate::domain::{Result, SourceRow, TidemarkError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Fault {
    Open(String),
    AfterRows(usize, String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory implementation of [`SourceTable`]
#[derive(Debug, Default)]
pub struct InMemorySource {
    rows: Mutex<Vec<SourceRow>>,
    queries: Mutex<Vec<RangeQuery>>,
    fault: Mutex<Option<Fault>>,
}

impl InMemorySource {
    /// Create a source holding `rows`
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Append rows, as if they were written to the table
    pub fn insert(&self, rows: impl IntoIterator<Item = SourceRow>) {
        lock(&self.rows).extend(rows);
    }

    /// Make the next `open` fail
    pub fn fail_next_open(&self, message: impl Into<String>) {
        *lock(&self.fault) = Some(Fault::Open(message.into()));
    }

    /// Make the next scan fail after yielding `rows` rows
    pub fn fail_next_scan_after(&self, rows: usize, message: impl Into<String>) {
        *lock(&self.fault) = Some(Fault::AfterRows(rows, message.into()));
    }

    /// Every query `open` has received, oldest first
    pub fn executed_queries(&self) -> Vec<RangeQuery> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl SourceTable for InMemorySource {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn open(&self, query: &RangeQuery) -> Result<Box<dyn RowCursor>> {
        lock(&self.queries).push(query.clone());

        let fault = lock(&self.fault).take();
        if let Some(Fault::Open(message)) = &fault {
            return Err(TidemarkError::QueryExecution(message.clone()));
        }

        let rows: VecDeque<SourceRow> = lock(&self.rows)
            .iter()
            .filter(|row| query.bounds.contains(row.update_ts, row.partition))
            .cloned()
            .collect();

        let fail_after = match fault {
            Some(Fault::AfterRows(after, message)) => Some((after, message)),
            _ => None,
        };

        Ok(Box::new(InMemoryCursor {
            rows,
            yielded: 0,
            fail_after,
        }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

struct InMemoryCursor {
    rows: VecDeque<SourceRow>,
    yielded: usize,
    fail_after: Option<(usize, String)>,
}

#[async_trait]
impl RowCursor for InMemoryCursor {
    async fn next_row(&mut self) -> Result<Option<SourceRow>> {
        if let Some((after, message)) = &self.fail_after {
            if self.yielded >= *after {
                return Err(TidemarkError::QueryExecution(message.clone()));
            }
        }

        let row = self.rows.pop_front();
        if row.is_some() {
            self.yielded += 1;
        }
        Ok(row)
    }
}
