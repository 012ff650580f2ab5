//! Watermark model for tracking capture state
//!
//! This module defines the composite low-water mark, the optional per-axis
//! end points and the persisted [`WatermarkState`] record that carries both.

use crate::domain::Axis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite low-water mark `(update_ts, partition)`
///
/// Every row with `update_ts` at or below this value (for the already-seen
/// partition) has been emitted. Ordering is lexicographic, update-ts first.
///
/// # Examples
///
/// ```
/// use tidemark::core::state::Watermark;
///
/// let before = Watermark::new(1000, 5);
/// let after = Watermark::new(1010, 1);
/// assert!(after > before);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Watermark {
    /// Highest update timestamp already captured
    pub update_ts: i64,

    /// Partition of the row that set `update_ts`
    pub partition: i64,
}

impl Watermark {
    /// Create a watermark from its two components
    pub fn new(update_ts: i64, partition: i64) -> Self {
        Self {
            update_ts,
            partition,
        }
    }

    /// The zero watermark, where a full resync starts
    pub fn zero() -> Self {
        Self::default()
    }

    /// Value of one axis
    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::UpdateTs => self.update_ts,
            Axis::Partition => self.partition,
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.update_ts, self.partition)
    }
}

/// Optional upper bound on one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndPoint {
    /// Inclusive upper bound
    pub bound: i64,

    /// Whether the bound applies to queries
    pub active: bool,
}

impl EndPoint {
    /// An active end point at `bound`
    pub fn active(bound: i64) -> Self {
        Self {
            bound,
            active: true,
        }
    }

    /// An end point that does not constrain anything
    pub fn inactive() -> Self {
        Self::default()
    }

    /// The bound if the end point is active
    pub fn bound(&self) -> Option<i64> {
        self.active.then_some(self.bound)
    }

    /// Whether `value` has reached this end point
    pub fn is_reached_by(&self, value: i64) -> bool {
        self.active && value >= self.bound
    }
}

/// Full capture state for one stream
///
/// This is the record persisted by [`StateStorage`](crate::adapters::database::StateStorage)
/// implementations. `version` increases by one on every write and is used
/// for compare-and-set so concurrent writers cannot silently overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkState {
    /// Stream name, usually the source table
    pub stream: String,

    /// Current low-water mark
    pub watermark: Watermark,

    /// End point on the update-ts axis
    pub update_end: EndPoint,

    /// End point on the partition axis
    pub partition_end: EndPoint,

    /// Write counter, 0 for a state that has never been persisted
    pub version: u64,

    /// When the state was last written
    pub updated_at: DateTime<Utc>,
}

impl WatermarkState {
    /// A fresh, never-persisted state at `watermark` with no end points
    pub fn new(stream: impl Into<String>, watermark: Watermark) -> Self {
        Self {
            stream: stream.into(),
            watermark,
            update_end: EndPoint::inactive(),
            partition_end: EndPoint::inactive(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// End point for an axis
    pub fn end_point(&self, axis: Axis) -> EndPoint {
        match axis {
            Axis::UpdateTs => self.update_end,
            Axis::Partition => self.partition_end,
        }
    }

    /// Mutable end point for an axis
    pub fn end_point_mut(&mut self, axis: Axis) -> &mut EndPoint {
        match axis {
            Axis::UpdateTs => &mut self.update_end,
            Axis::Partition => &mut self.partition_end,
        }
    }

    /// Whether the low-water mark has reached the active end point of `axis`
    pub fn is_closed(&self, axis: Axis) -> bool {
        self.end_point(axis).is_reached_by(self.watermark.get(axis))
    }

    /// All axes that are currently closed
    pub fn closed_axes(&self) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|axis| self.is_closed(*axis))
            .collect()
    }

    /// Copy of this state one version later
    pub(crate) fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = Utc::now();
        next
    }
}
