// Tidemark - Watermark-driven incremental change capture
// Copyright (c) 2025 Tidemark Contributors
// Licensed under the MIT License

//! # Tidemark - Watermark-driven incremental change capture
//!
//! Tidemark polls a relational table on a fixed delay and forwards every row
//! that changed since the previous poll. Progress is tracked as a composite
//! watermark `(update_ts, partition)` that is persisted after each poll, so a
//! restart resumes where the previous process stopped.
//!
//! ## Overview
//!
//! This library provides:
//! - **Watermark storage** with pluggable persistence (in-memory, PostgreSQL)
//! - **Range queries** built from the watermark and optional end points
//! - **A poll engine** that streams rows to a sink and commits the watermark
//!   only once the result set is exhausted
//! - **A fixed-delay scheduler** with graceful shutdown
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Watermark store, query construction, poll engine, scheduler
//! - [`adapters`] - Source tables, state storage and row sinks
//! - [`domain`] - Identifiers, rows and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidemark::adapters::database::{create_adapters, create_sink};
//! use tidemark::config::load_config;
//! use tidemark::core::poll::PollEngine;
//! use tidemark::core::state::WatermarkStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tidemark.toml")?;
//!
//!     let adapters = create_adapters(&config).await?;
//!     let store =
//!         WatermarkStore::open(config.stream_name(), adapters.state, &config.seed_options())
//!             .await?;
//!     let engine = PollEngine::new(
//!         config.source.query_spec()?,
//!         adapters.source,
//!         create_sink(&config).await?,
//!         Arc::new(store),
//!     );
//!
//!     let report = engine.run().await;
//!     println!("Emitted {} rows, watermark {:?}", report.rows_emitted, report.committed);
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery Semantics
//!
//! Delivery is at-least-once. A poll that fails after forwarding some rows
//! does not move the watermark, and the next poll re-reads the same range.
//! Rows sharing the committed update timestamp but arriving after the poll
//! are not picked up (`update_ts > watermark` is strict).
//!
//! ## Error Handling
//!
//! Tidemark uses the [`domain::TidemarkError`] type for all errors:
//!
//! ```rust,no_run
//! use tidemark::domain::TidemarkError;
//!
//! fn example() -> Result<(), TidemarkError> {
//!     let config = tidemark::config::load_config("tidemark.toml")?;
//!     println!("Polling {}", config.stream_name());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
