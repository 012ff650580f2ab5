//! In-memory adapters
//!
//! Process-local implementations of the source and state traits. The state
//! storage backs the `memory` state backend; the source is used by tests
//! and local experiments.

pub mod source;
pub mod state;

pub use source::InMemorySource;
pub use state::InMemoryStateStorage;
