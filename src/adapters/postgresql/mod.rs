//! PostgreSQL integration
//!
//! Source table polling and watermark state persistence over a shared
//! connection pool.

pub mod client;
mod decode;
pub mod models;
pub mod source;
pub mod state;

pub use client::PostgreSQLClient;
pub use models::PostgreSQLStateRow;
pub use source::PostgreSQLSource;
pub use state::PostgreSQLStateStorage;
