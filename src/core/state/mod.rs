// State management and watermark tracking

pub mod store;
pub mod watermark;

pub use store::{PollLease, SeedOptions, WatermarkStore};
pub use watermark::{EndPoint, Watermark, WatermarkState};
