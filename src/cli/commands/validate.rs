//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the tidemark configuration file.

use crate::adapters::postgresql::client::redact;
use crate::config::load_config;
use crate::config::schema::{SinkKind, TidemarkConfig};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(super::EXIT_CONFIG);
            }
        };

        if let Err(e) = config.validate() {
            println!("Configuration validation failed");
            println!("   Error: {e}");
            println!();
            return Ok(super::EXIT_CONFIG);
        }

        println!("Configuration is valid");
        println!();
        print_summary(&config);
        Ok(super::EXIT_OK)
    }
}

fn print_summary(config: &TidemarkConfig) {
    use secrecy::ExposeSecret;

    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Source Driver: {}", config.source.driver);
    println!(
        "  Source Connection: {}",
        redact(config.source.connection_string.expose_secret().as_ref())
    );
    println!("  Table: {}", config.source.table);
    println!(
        "  Watermark Columns: {} / {}",
        config.source.update_column, config.source.partition_column
    );
    println!("  Columns: {}", config.source.select_columns.join(", "));
    println!("  Stream: {}", config.stream_name());

    let seed = config.seed_options().watermark();
    match (config.capture.seed_update_ts, config.capture.seed_partition) {
        (None, None) => println!("  Seed: now (partition 0)"),
        _ => println!("  Seed: {seed}"),
    }
    if let Some(end) = config.capture.end_update_ts {
        println!("  Update-ts End Point: {end}");
    }
    if let Some(end) = config.capture.end_partition {
        println!("  Partition End Point: {end}");
    }

    println!(
        "  Schedule: first poll after {}s, then every {}s",
        config.schedule.initial_delay_seconds, config.schedule.poll_interval_seconds
    );
    println!(
        "  State Backend: {} (resume: {})",
        config.state.backend, config.state.resume
    );
    match config.sink.kind {
        SinkKind::Stdout => println!("  Sink: stdout"),
        SinkKind::File => println!(
            "  Sink: file {}",
            config.sink.path.as_deref().unwrap_or("<unset>")
        ),
    }
    println!();
}
