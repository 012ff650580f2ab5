//! Collecting sink

use super::RowSink;
use crate::domain::{Result, SourceRow, TidemarkError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Sink that keeps every row it receives
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<SourceRow>>,
    fail_after: AtomicUsize,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows received so far, in arrival order
    pub fn rows(&self) -> Vec<SourceRow> {
        self.lock().clone()
    }

    /// Reject sends once `accepted` more rows have been received
    pub fn fail_after(&self, accepted: usize) {
        self.fail_after.store(accepted + 1, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SourceRow>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn send(&self, row: &SourceRow) -> Result<()> {
        // 0 disables the fault, 1 means "fail this send"
        match self.fail_after.load(Ordering::SeqCst) {
            0 => {}
            1 => {
                self.fail_after.store(0, Ordering::SeqCst);
                return Err(TidemarkError::Sink("Injected sink failure".to_string()));
            }
            n => self.fail_after.store(n - 1, Ordering::SeqCst),
        }

        self.lock().push(row.clone());
        Ok(())
    }
}
