//! CLI command implementations
//!
//! Every command returns its process exit code. The helpers here load the
//! configuration and wire the poll pipeline the same way for `run` and `poll`.

pub mod init;
pub mod poll;
pub mod run;
pub mod state;
pub mod validate;

use crate::adapters::database::{create_adapters, create_sink};
use crate::config::{load_config, TidemarkConfig};
use crate::core::poll::PollEngine;
use crate::core::state::WatermarkStore;
use crate::domain::TidemarkError;
use std::sync::Arc;

/// Exit code: success
pub const EXIT_OK: i32 = 0;
/// Exit code: poll failed or operation rejected
pub const EXIT_FAILED: i32 = 1;
/// Exit code: configuration error
pub const EXIT_CONFIG: i32 = 2;
/// Exit code: source or state storage unreachable
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code: unexpected fatal error
pub const EXIT_FATAL: i32 = 5;
/// Exit code: stopped by SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

/// Load and validate the configuration file
///
/// Prints the failure to stderr and returns the configuration exit code.
pub(crate) fn load_validated(config_path: &str) -> Result<TidemarkConfig, i32> {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, config_path = %config_path, "Failed to load configuration");
            eprintln!("Failed to load configuration: {e}");
            return Err(EXIT_CONFIG);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("Configuration validation failed: {e}");
        return Err(EXIT_CONFIG);
    }

    Ok(config)
}

/// Exit code for an error raised while wiring the pipeline
pub(crate) fn setup_exit_code(error: &TidemarkError) -> i32 {
    match error {
        TidemarkError::Configuration(_) | TidemarkError::Validation(_) => EXIT_CONFIG,
        _ => EXIT_CONNECTION,
    }
}

/// Build the poll engine for the configured stream
///
/// Connects to the source, opens the watermark store (seeding it per the
/// `resume` setting), applies configured end points and opens the sink.
pub(crate) async fn build_engine(config: &TidemarkConfig) -> crate::domain::Result<PollEngine> {
    let spec = config.source.query_spec()?;
    let adapters = create_adapters(config).await?;

    adapters.source.test_connection().await?;
    tracing::info!(source = %adapters.source.describe(), "Source connection verified");

    let store = WatermarkStore::open(config.stream_name(), adapters.state, &config.seed_options())
        .await?;
    store
        .apply_end_points(config.capture.end_update_ts, config.capture.end_partition)
        .await?;

    let sink = create_sink(config).await?;

    Ok(PollEngine::new(spec, adapters.source, sink, Arc::new(store)))
}
