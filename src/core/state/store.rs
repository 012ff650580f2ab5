//! Watermark store
//!
//! The store is the single owner of a stream's [`WatermarkState`]. Operator
//! calls (`seed`, `set_end_point`, `reset`) and poll commits all go through
//! the same lock, and every change is written to the backing
//! [`StateStorage`] before it becomes visible in memory.

use crate::adapters::database::traits::StateStorage;
use crate::core::state::watermark::{EndPoint, Watermark, WatermarkState};
use crate::domain::context::ResultExt;
use crate::domain::{Axis, Result, TidemarkError};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// How the store picks its starting watermark
#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    /// Starting update timestamp (default: now, in epoch milliseconds)
    pub update_ts: Option<i64>,

    /// Starting partition (default: 0)
    pub partition: Option<i64>,

    /// Continue from persisted state when one exists
    pub resume: bool,
}

impl SeedOptions {
    /// Resolve the seed watermark, filling in defaults
    pub fn watermark(&self) -> Watermark {
        Watermark::new(
            self.update_ts
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            self.partition.unwrap_or(0),
        )
    }

    fn is_explicit(&self) -> bool {
        self.update_ts.is_some() || self.partition.is_some()
    }
}

/// Single-writer owner of one stream's capture state
pub struct WatermarkStore {
    stream: String,
    storage: Arc<dyn StateStorage + Send + Sync>,
    state: Mutex<WatermarkState>,
}

impl WatermarkStore {
    /// Open the store for a stream
    ///
    /// With `resume` set and a persisted state present, the persisted state is
    /// used as-is. Otherwise the seed is applied on top of whatever is stored,
    /// with the usual gap/replay warning, and a fresh stream is persisted
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or written.
    pub async fn open(
        stream: impl Into<String>,
        storage: Arc<dyn StateStorage + Send + Sync>,
        seed: &SeedOptions,
    ) -> Result<Self> {
        let stream = stream.into();
        let persisted = storage
            .load(&stream)
            .await
            .with_context(|| format!("Failed to load state of stream '{stream}'"))?;

        match persisted {
            Some(state) if seed.resume => {
                if seed.is_explicit() {
                    tracing::info!(
                        stream = %stream,
                        watermark = %state.watermark,
                        "Resuming from persisted state, configured seed ignored"
                    );
                } else {
                    tracing::info!(
                        stream = %stream,
                        watermark = %state.watermark,
                        version = state.version,
                        "Resuming from persisted state"
                    );
                }
                Ok(Self::with_state(storage, state))
            }
            Some(state) => {
                let store = Self::with_state(storage, state);
                let target = seed.watermark();
                store.seed(target.update_ts, target.partition).await?;
                Ok(store)
            }
            None => {
                let fresh = WatermarkState::new(stream.clone(), seed.watermark());
                let initial = fresh.next_version();
                storage.save(&initial, fresh.version).await?;
                tracing::info!(
                    stream = %stream,
                    watermark = %initial.watermark,
                    backend = storage.backend_name(),
                    "Initialized watermark from seed"
                );
                Ok(Self::with_state(storage, initial))
            }
        }
    }

    fn with_state(storage: Arc<dyn StateStorage + Send + Sync>, state: WatermarkState) -> Self {
        Self {
            stream: state.stream.clone(),
            storage,
            state: Mutex::new(state),
        }
    }

    /// Stream this store tracks
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Present low-water mark
    pub async fn current(&self) -> Watermark {
        self.state.lock().await.watermark
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> WatermarkState {
        self.state.lock().await.clone()
    }

    /// Set the low-water mark directly
    ///
    /// Always honored. Moving forward may leave a gap of rows that will never
    /// be read; moving back (or staying put) replays rows already delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the new state cannot be persisted; the in-memory
    /// state is unchanged in that case.
    pub async fn seed(&self, update_ts: i64, partition: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        let requested = Watermark::new(update_ts, partition);
        let previous = state.watermark;

        if requested > previous {
            tracing::warn!(
                stream = %self.stream,
                previous = %previous,
                requested = %requested,
                "Skipping ahead: rows between the old and new watermark will never be read"
            );
        } else {
            tracing::warn!(
                stream = %self.stream,
                previous = %previous,
                requested = %requested,
                "Rewinding: already-emitted rows will be replayed and may duplicate downstream"
            );
        }

        let mut next = state.next_version();
        next.watermark = requested;
        self.persist(&mut state, next).await
    }

    /// Activate an end point on one axis
    ///
    /// # Errors
    ///
    /// Returns [`TidemarkError::InvalidRange`] when `bound` is not strictly
    /// greater than the current value on that axis; the state is unchanged.
    pub async fn set_end_point(&self, axis: Axis, bound: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        let current = state.watermark.get(axis);

        if bound <= current {
            return Err(TidemarkError::InvalidRange {
                axis,
                bound,
                current,
            });
        }

        let mut next = state.next_version();
        *next.end_point_mut(axis) = EndPoint::active(bound);
        self.persist(&mut state, next).await?;

        tracing::info!(stream = %self.stream, axis = %axis, bound, "End point activated");
        Ok(())
    }

    /// Deactivate the end point on one axis, reopening it
    pub async fn clear_end_point(&self, axis: Axis) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.end_point(axis).active {
            return Ok(());
        }

        let mut next = state.next_version();
        next.end_point_mut(axis).active = false;
        self.persist(&mut state, next).await?;

        tracing::info!(stream = %self.stream, axis = %axis, "End point cleared");
        Ok(())
    }

    /// Zero the watermark and deactivate both end points (full resync)
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut next = state.next_version();
        next.watermark = Watermark::zero();
        next.update_end.active = false;
        next.partition_end.active = false;
        self.persist(&mut state, next).await?;

        tracing::warn!(
            stream = %self.stream,
            "State cleared: the next poll re-reads the table from zero"
        );
        Ok(())
    }

    /// Apply end points taken from configuration at startup
    ///
    /// An axis without a bound, or already closed at that bound, is left
    /// alone. A bound that is not ahead of the watermark is logged and
    /// skipped so a stale config cannot stop a resumed stream from starting.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting an end point fails.
    pub async fn apply_end_points(
        &self,
        update_end: Option<i64>,
        partition_end: Option<i64>,
    ) -> Result<()> {
        for (axis, bound) in [(Axis::UpdateTs, update_end), (Axis::Partition, partition_end)] {
            let Some(bound) = bound else { continue };

            if self.state.lock().await.end_point(axis) == EndPoint::active(bound) {
                continue;
            }

            match self.set_end_point(axis, bound).await {
                Ok(()) => {}
                Err(e @ TidemarkError::InvalidRange { .. }) => {
                    tracing::error!(
                        stream = %self.stream,
                        axis = %axis,
                        error = %e,
                        "Configured end point rejected, axis left open"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Lock the store for one poll invocation
    ///
    /// The state is refreshed from storage first so changes written by an
    /// operator from another process are picked up. The returned lease holds
    /// the lock until it is committed or dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    pub async fn begin_poll(&self) -> Result<PollLease<'_>> {
        let mut state = self.state.lock().await;

        if let Some(stored) = self.storage.load(&self.stream).await? {
            if stored.version != state.version {
                tracing::info!(
                    stream = %self.stream,
                    cached_version = state.version,
                    stored_version = stored.version,
                    watermark = %stored.watermark,
                    "Stored state changed outside this process, reloading"
                );
                *state = stored;
            }
        }

        Ok(PollLease { store: self, state })
    }

    async fn persist(
        &self,
        state: &mut MutexGuard<'_, WatermarkState>,
        next: WatermarkState,
    ) -> Result<()> {
        self.storage.save(&next, state.version).await?;
        **state = next;
        Ok(())
    }
}

/// Exclusive view of the store held by one poll invocation
///
/// Dropping the lease without committing leaves the state untouched.
pub struct PollLease<'a> {
    store: &'a WatermarkStore,
    state: MutexGuard<'a, WatermarkState>,
}

impl PollLease<'_> {
    /// State the poll starts from
    pub fn state(&self) -> &WatermarkState {
        &self.state
    }

    /// Replace the low-water mark with the scan's candidate
    ///
    /// An unchanged candidate is not written.
    ///
    /// # Errors
    ///
    /// Returns [`TidemarkError::State`] if the candidate is behind the current
    /// watermark, or the storage error if persisting fails. Either way the
    /// state is unchanged.
    pub async fn commit(mut self, candidate: Watermark) -> Result<WatermarkState> {
        let current = self.state.watermark;

        if candidate < current {
            return Err(TidemarkError::State(format!(
                "Refusing to move watermark of '{}' backwards from {} to {}",
                self.store.stream, current, candidate
            )));
        }
        if candidate == current {
            return Ok(self.state.clone());
        }

        let mut next = self.state.next_version();
        next.watermark = candidate;
        self.store.persist(&mut self.state, next).await?;

        tracing::debug!(
            stream = %self.store.stream,
            previous = %current,
            committed = %candidate,
            version = self.state.version,
            "Watermark committed"
        );
        Ok(self.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateStorage;

    fn seed_at(update_ts: i64, partition: i64) -> SeedOptions {
        SeedOptions {
            update_ts: Some(update_ts),
            partition: Some(partition),
            resume: true,
        }
    }

    async fn open_store(update_ts: i64, partition: i64) -> (WatermarkStore, Arc<InMemoryStateStorage>) {
        let storage = Arc::new(InMemoryStateStorage::new());
        let store = WatermarkStore::open("orders", storage.clone(), &seed_at(update_ts, partition))
            .await
            .unwrap();
        (store, storage)
    }

    #[tokio::test]
    async fn test_open_fresh_persists_seed() {
        let (store, storage) = open_store(1000, 0).await;

        assert_eq!(store.current().await, Watermark::new(1000, 0));
        let stored = storage.load("orders").await.unwrap().unwrap();
        assert_eq!(stored.watermark, Watermark::new(1000, 0));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_open_default_seed_is_now() {
        let before = Utc::now().timestamp_millis();
        let storage = Arc::new(InMemoryStateStorage::new());
        let store = WatermarkStore::open("orders", storage, &SeedOptions::default())
            .await
            .unwrap();

        let current = store.current().await;
        assert!(current.update_ts >= before);
        assert_eq!(current.partition, 0);
    }

    #[tokio::test]
    async fn test_open_resumes_persisted_state() {
        let storage = Arc::new(InMemoryStateStorage::new());
        {
            let store = WatermarkStore::open("orders", storage.clone(), &seed_at(1000, 0))
                .await
                .unwrap();
            store.seed(4000, 2).await.unwrap();
        }

        let reopened = WatermarkStore::open("orders", storage, &seed_at(1000, 0))
            .await
            .unwrap();
        assert_eq!(reopened.current().await, Watermark::new(4000, 2));
    }

    #[tokio::test]
    async fn test_open_without_resume_applies_seed() {
        let storage = Arc::new(InMemoryStateStorage::new());
        WatermarkStore::open("orders", storage.clone(), &seed_at(4000, 2))
            .await
            .unwrap();

        let options = SeedOptions {
            resume: false,
            ..seed_at(1000, 0)
        };
        let reopened = WatermarkStore::open("orders", storage, &options).await.unwrap();
        assert_eq!(reopened.current().await, Watermark::new(1000, 0));
    }

    #[tokio::test]
    async fn test_seed_forward_and_back_are_honored() {
        let (store, _) = open_store(1000, 0).await;

        store.seed(2000, 5).await.unwrap();
        assert_eq!(store.current().await, Watermark::new(2000, 5));

        store.seed(10, 0).await.unwrap();
        assert_eq!(store.current().await, Watermark::new(10, 0));
    }

    #[tokio::test]
    async fn test_set_end_point_before_start_is_rejected() {
        let (store, _) = open_store(1000, 0).await;
        let before = store.snapshot().await;

        let err = store.set_end_point(Axis::UpdateTs, 500).await.unwrap_err();
        assert!(matches!(
            err,
            TidemarkError::InvalidRange {
                axis: Axis::UpdateTs,
                bound: 500,
                current: 1000
            }
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_set_end_point_equal_to_start_is_rejected() {
        let (store, _) = open_store(1000, 7).await;
        assert!(store.set_end_point(Axis::Partition, 7).await.is_err());
        assert!(!store.snapshot().await.partition_end.active);
    }

    #[tokio::test]
    async fn test_set_and_clear_end_point() {
        let (store, _) = open_store(1000, 0).await;

        store.set_end_point(Axis::Partition, 9).await.unwrap();
        assert_eq!(store.snapshot().await.partition_end, EndPoint::active(9));

        store.clear_end_point(Axis::Partition).await.unwrap();
        assert!(!store.snapshot().await.partition_end.active);
    }

    #[tokio::test]
    async fn test_reset_zeroes_and_deactivates() {
        let (store, _) = open_store(1000, 3).await;
        store.set_end_point(Axis::UpdateTs, 5000).await.unwrap();
        store.set_end_point(Axis::Partition, 10).await.unwrap();

        store.reset().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.watermark, Watermark::zero());
        assert!(!state.update_end.active);
        assert!(!state.partition_end.active);
    }

    #[tokio::test]
    async fn test_commit_advances_and_persists() {
        let (store, storage) = open_store(1000, 0).await;

        let lease = store.begin_poll().await.unwrap();
        let committed = lease.commit(Watermark::new(1010, 1)).await.unwrap();

        assert_eq!(committed.watermark, Watermark::new(1010, 1));
        assert_eq!(store.current().await, Watermark::new(1010, 1));
        let stored = storage.load("orders").await.unwrap().unwrap();
        assert_eq!(stored.watermark, Watermark::new(1010, 1));
    }

    #[tokio::test]
    async fn test_commit_rejects_regression() {
        let (store, _) = open_store(1000, 0).await;

        let lease = store.begin_poll().await.unwrap();
        assert!(lease.commit(Watermark::new(999, 9)).await.is_err());
        assert_eq!(store.current().await, Watermark::new(1000, 0));
    }

    #[tokio::test]
    async fn test_unchanged_commit_skips_write() {
        let (store, storage) = open_store(1000, 0).await;
        let version = store.snapshot().await.version;

        let lease = store.begin_poll().await.unwrap();
        lease.commit(Watermark::new(1000, 0)).await.unwrap();

        assert_eq!(storage.load("orders").await.unwrap().unwrap().version, version);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_untouched() {
        let (store, storage) = open_store(1000, 0).await;
        storage.fail_next_save();

        let lease = store.begin_poll().await.unwrap();
        assert!(lease.commit(Watermark::new(2000, 0)).await.is_err());
        assert_eq!(store.current().await, Watermark::new(1000, 0));
    }

    #[tokio::test]
    async fn test_begin_poll_picks_up_external_change() {
        let (store, storage) = open_store(1000, 0).await;

        let other = WatermarkStore::open("orders", storage.clone(), &seed_at(0, 0))
            .await
            .unwrap();
        other.seed(7000, 1).await.unwrap();

        let lease = store.begin_poll().await.unwrap();
        assert_eq!(lease.state().watermark, Watermark::new(7000, 1));
    }

    #[tokio::test]
    async fn test_apply_end_points_activates_configured_bounds() {
        let (store, _) = open_store(1000, 0).await;

        store.apply_end_points(Some(5000), None).await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.update_end, EndPoint::active(5000));
        assert!(!state.partition_end.active);
    }

    #[tokio::test]
    async fn test_apply_end_points_same_bound_skips_write() {
        let (store, storage) = open_store(1000, 0).await;
        store.apply_end_points(Some(5000), Some(4)).await.unwrap();
        let version = storage.load("orders").await.unwrap().unwrap().version;

        store.apply_end_points(Some(5000), Some(4)).await.unwrap();

        assert_eq!(storage.load("orders").await.unwrap().unwrap().version, version);
    }

    #[tokio::test]
    async fn test_apply_end_points_invalid_bound_is_skipped() {
        let (store, _) = open_store(1000, 3).await;

        store.apply_end_points(Some(900), Some(8)).await.unwrap();

        let state = store.snapshot().await;
        assert!(!state.update_end.active);
        assert_eq!(state.partition_end, EndPoint::active(8));
    }

    #[tokio::test]
    async fn test_apply_end_points_propagates_storage_failure() {
        let (store, storage) = open_store(1000, 0).await;
        storage.fail_next_save();

        assert!(matches!(
            store.apply_end_points(Some(5000), None).await,
            Err(TidemarkError::Database(_))
        ));
    }
}
