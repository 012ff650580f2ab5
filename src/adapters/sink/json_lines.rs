//! JSON lines sink
//!
//! Writes one JSON object per row to any async writer. Used for the
//! `stdout` and `file` sink kinds.

use super::RowSink;
use crate::domain::{Result, SourceRow, TidemarkError};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Sink writing newline-delimited JSON
pub struct JsonLinesSink<W> {
    writer: Mutex<BufWriter<W>>,
    target: String,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer; `target` names it in error messages
    pub fn new(writer: W, target: impl Into<String>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            target: target.into(),
        }
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout(), "stdout")
    }
}

impl JsonLinesSink<tokio::fs::File> {
    /// Sink appending to a file, created if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                TidemarkError::Sink(format!("Failed to open {}: {}", path.display(), e))
            })?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

#[async_trait]
impl<W> RowSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, row: &SourceRow) -> Result<()> {
        let mut line = serde_json::to_vec(&row.to_json())?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| TidemarkError::Sink(format!("Write to {} failed: {}", self.target, e)))
    }

    async fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .flush()
            .await
            .map_err(|e| TidemarkError::Sink(format!("Flush of {} failed: {}", self.target, e)))
    }
}
