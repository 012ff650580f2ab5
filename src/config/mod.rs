//! Configuration management for Tidemark.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `TIDEMARK_<SECTION>_<KEY>`
//! environment overrides and validation on load.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tidemark::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tidemark.toml")?;
//! println!("Polling {} every {}s", config.source.table, config.schedule.poll_interval_seconds);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! connection_string = "postgresql://cdc@db.internal:5432/shop"
//! password = "${TIDEMARK_SOURCE_PASSWORD}"
//! table = "public.orders"
//! update_column = "updated_at_ms"
//! partition_column = "shard_id"
//!
//! [capture]
//! seed_update_ts = 1700000000000
//! end_update_ts = 1800000000000
//!
//! [schedule]
//! poll_interval_seconds = 5
//!
//! [state]
//! backend = "postgresql"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, CaptureConfig, LoggingConfig, ScheduleConfig, SinkConfig, SinkKind,
    SourceConfig, SourceDriver, StateBackend, StateConfig, TidemarkConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
