//! Process-local state storage
//!
//! Keeps watermark state in memory only. State is lost when the process
//! exits, so a restart falls back to the configured seed.

use crate::adapters::database::traits::StateStorage;
use crate::core::state::watermark::WatermarkState;
use crate::domain::{Result, TidemarkError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation of [`StateStorage`]
#[derive(Debug, Default)]
pub struct InMemoryStateStorage {
    states: Mutex<HashMap<String, WatermarkState>>,
    fail_next_save: AtomicBool,
}

impl InMemoryStateStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save` fail with a database error
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, WatermarkState>> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StateStorage for InMemoryStateStorage {
    async fn load(&self, stream: &str) -> Result<Option<WatermarkState>> {
        Ok(self.states().get(stream).cloned())
    }

    async fn save(&self, state: &WatermarkState, expected_version: u64) -> Result<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(TidemarkError::Database(format!(
                "Injected save failure for stream '{}'",
                state.stream
            )));
        }

        let mut states = self.states();
        let found = states.get(&state.stream).map_or(0, |stored| stored.version);
        if found != expected_version {
            return Err(TidemarkError::StateConflict {
                stream: state.stream.clone(),
                expected: expected_version,
                found,
            });
        }

        states.insert(state.stream.clone(), state.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WatermarkState>> {
        let mut states: Vec<WatermarkState> = self.states().values().cloned().collect();
        states.sort_by(|a, b| a.stream.cmp(&b.stream));
        Ok(states)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
