//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for tidemark using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tidemark - Watermark-driven incremental change capture
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version, about, long_about = None)]
#[command(author = "Tidemark Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tidemark.toml", env = "TIDEMARK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TIDEMARK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the configured table on a fixed delay until interrupted
    Run(commands::run::RunArgs),

    /// Run a single poll and exit
    Poll(commands::poll::PollArgs),

    /// Inspect or change the stored watermark
    State(commands::state::StateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Commands {
    /// Whether the command polls the source and should log like a service
    pub fn is_polling(&self) -> bool {
        matches!(self, Commands::Run(_) | Commands::Poll(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Axis;
    use clap::CommandFactory;
    use commands::state::StateAction;

    #[test]
    fn test_set_end_help_describes_inclusive_bound() {
        let mut command = Cli::command();
        let set_end = command
            .find_subcommand_mut("state")
            .unwrap()
            .find_subcommand_mut("set-end")
            .unwrap();
        let bound = set_end
            .get_arguments()
            .find(|arg| arg.get_id() == "bound")
            .unwrap();

        let help = bound.get_help().unwrap().to_string();
        assert!(help.starts_with("Inclusive upper bound"));
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["tidemark", "run"]);
        assert_eq!(cli.config, "tidemark.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
        assert!(cli.command.is_polling());
    }

    #[test]
    fn test_cli_parse_run_overrides() {
        let cli = Cli::parse_from(["tidemark", "run", "--now", "--interval", "5"]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.now);
                assert_eq!(args.interval, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["tidemark", "--config", "custom.toml", "poll"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Poll(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["tidemark", "--log-level", "debug", "poll"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["tidemark", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
        assert!(!cli.command.is_polling());
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["tidemark", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_parse_state_set() {
        let cli = Cli::parse_from([
            "tidemark",
            "state",
            "set",
            "--update-ts",
            "1000",
            "--partition",
            "3",
        ]);
        match cli.command {
            Commands::State(args) => assert!(matches!(
                args.action,
                StateAction::Set {
                    update_ts: 1000,
                    partition: 3
                }
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_state_set_end() {
        let cli = Cli::parse_from([
            "tidemark", "state", "set-end", "--axis", "update_ts", "--bound", "5000",
        ]);
        match cli.command {
            Commands::State(args) => assert!(matches!(
                args.action,
                StateAction::SetEnd {
                    axis: Axis::UpdateTs,
                    bound: 5000
                }
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_state_clear_end() {
        let cli = Cli::parse_from(["tidemark", "state", "clear-end", "--axis", "partition"]);
        match cli.command {
            Commands::State(args) => assert!(matches!(
                args.action,
                StateAction::ClearEnd {
                    axis: Axis::Partition
                }
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_axis() {
        let result = Cli::try_parse_from([
            "tidemark", "state", "set-end", "--axis", "rowid", "--bound", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_state_show_json() {
        let cli = Cli::parse_from(["tidemark", "state", "show", "--json"]);
        match cli.command {
            Commands::State(args) => assert!(matches!(
                args.action,
                StateAction::Show {
                    json: true,
                    all: false
                }
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
