//! Watermark-driven polling
//!
//! - [`query`] - Range query construction from the watermark state
//! - [`engine`] - Single-flight poll invocation (query, scan, emit, commit)
//! - [`scheduler`] - Fixed-delay timer driving the engine
//! - [`report`] - Per-invocation and per-run reporting

pub mod engine;
pub mod query;
pub mod report;
pub mod scheduler;

pub use engine::{advance, PollEngine};
pub use query::{Projection, QuerySpec, RangeBounds, RangeQuery};
pub use report::{PollOutcome, PollReport, SchedulerSummary};
pub use scheduler::{PollScheduler, ScheduleSettings};
