//! State command implementation
//!
//! Operator access to the persisted watermark of the configured stream:
//! inspect it, reset it, move it, and set or clear end points.

use super::{load_validated, setup_exit_code, EXIT_FAILED, EXIT_OK};
use crate::adapters::database::{create_state_storage, StateStorage};
use crate::config::TidemarkConfig;
use crate::core::state::{SeedOptions, WatermarkState, WatermarkStore};
use crate::domain::{Axis, TidemarkError};
use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::sync::Arc;

/// Arguments for the state command
#[derive(Args, Debug)]
pub struct StateArgs {
    /// State operation to perform
    #[command(subcommand)]
    pub action: StateAction,
}

/// State operations
#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Show the stored watermark and end points
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Show every stream in the state storage
        #[arg(long)]
        all: bool,
    },

    /// Zero the watermark and clear both end points (full resync)
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Move the watermark; rows may be skipped or replayed
    Set {
        /// New update timestamp
        #[arg(long, allow_negative_numbers = true)]
        update_ts: i64,

        /// New partition value
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        partition: i64,
    },

    /// Activate an end point on one axis
    SetEnd {
        /// Axis to bound (update_ts or partition)
        #[arg(long)]
        axis: Axis,

        /// Inclusive upper bound, must be ahead of the watermark
        #[arg(long, allow_negative_numbers = true)]
        bound: i64,
    },

    /// Deactivate the end point on one axis
    ClearEnd {
        /// Axis to reopen (update_ts or partition)
        #[arg(long)]
        axis: Axis,
    },
}

impl StateArgs {
    /// Execute the state command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_validated(config_path) {
            Ok(config) => config,
            Err(code) => return Ok(code),
        };

        let storage = match create_state_storage(&config, None).await {
            Ok(storage) => storage,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open state storage");
                eprintln!("Failed to open state storage: {e}");
                return Ok(setup_exit_code(&e));
            }
        };

        let stream = config.stream_name();
        tracing::info!(stream = %stream, backend = storage.backend_name(), "State command");

        if let StateAction::Show { json, all } = self.action {
            return show(storage.as_ref(), &stream, json, all).await;
        }

        if let StateAction::Clear { yes: false } = self.action {
            if !confirm(&format!(
                "Reset stream '{stream}' to zero? The next poll re-reads the whole table. [y/N]: "
            ))? {
                println!("Clear cancelled.");
                return Ok(EXIT_OK);
            }
        }

        let store = match open_store(&config, storage).await {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Failed to load state: {e}");
                return Ok(setup_exit_code(&e));
            }
        };

        let result = match &self.action {
            StateAction::Show { .. } => Ok(()),
            StateAction::Clear { .. } => store.reset().await,
            StateAction::Set {
                update_ts,
                partition,
            } => store.seed(*update_ts, *partition).await,
            StateAction::SetEnd { axis, bound } => store.set_end_point(*axis, *bound).await,
            StateAction::ClearEnd { axis } => store.clear_end_point(*axis).await,
        };

        match result {
            Ok(()) => {
                println!("State updated.");
                print_state(&store.snapshot().await);
                Ok(EXIT_OK)
            }
            Err(e @ TidemarkError::InvalidRange { .. }) => {
                tracing::error!(error = %e, "End point rejected");
                println!("Rejected: {e}");
                Ok(EXIT_FAILED)
            }
            Err(e @ TidemarkError::StateConflict { .. }) => {
                tracing::error!(error = %e, "State changed concurrently");
                println!("State changed while updating it, retry the command: {e}");
                Ok(EXIT_FAILED)
            }
            Err(e) => {
                tracing::error!(error = %e, "State update failed");
                eprintln!("State update failed: {e}");
                Ok(setup_exit_code(&e))
            }
        }
    }
}

/// Open the store without overriding what is already persisted
async fn open_store(
    config: &TidemarkConfig,
    storage: Arc<dyn StateStorage + Send + Sync>,
) -> crate::domain::Result<WatermarkStore> {
    let seed = SeedOptions {
        resume: true,
        ..config.seed_options()
    };
    WatermarkStore::open(config.stream_name(), storage, &seed).await
}

async fn show(
    storage: &(dyn StateStorage + Send + Sync),
    stream: &str,
    json: bool,
    all: bool,
) -> anyhow::Result<i32> {
    let states = if all {
        storage.list().await?
    } else {
        storage.load(stream).await?.into_iter().collect()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(EXIT_OK);
    }

    if states.is_empty() {
        println!("No state stored for stream '{stream}'.");
        println!("   The first poll starts from the configured seed.");
        return Ok(EXIT_OK);
    }

    for state in &states {
        print_state(state);
    }
    Ok(EXIT_OK)
}

fn print_state(state: &WatermarkState) {
    println!();
    println!("Stream: {}", state.stream);
    println!("  Watermark: {}", state.watermark);
    for axis in Axis::ALL {
        let end = state.end_point(axis);
        match end.bound() {
            Some(bound) if state.is_closed(axis) => {
                println!("  {axis} End: {bound} (closed)")
            }
            Some(bound) => println!("  {axis} End: {bound}"),
            None => println!("  {axis} End: none"),
        }
    }
    println!("  Version: {}", state.version);
    println!("  Updated: {}", state.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
