//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start the scheduler daemon in the foreground
//! - tick: force a single scheduling tick
//! - add: create a task from explicit flags
//! - list: list tasks
//! - deactivate: soft-delete a task

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// schedr - A recurring task scheduling and execution daemon
#[derive(Parser, Debug)]
#[command(name = "schedr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler daemon in the foreground
    Run,

    /// Force one scheduling tick outside the timer cadence
    Tick,

    /// Add a new task
    Add {
        /// Human-readable task description
        description: String,

        /// Task kind (reminder, summary, fetch, learning)
        #[arg(short, long, default_value = "reminder")]
        kind: String,

        /// Recurrence frequency (once, hourly, daily, weekly, monthly, every_x_minutes)
        #[arg(short, long, default_value = "once")]
        frequency: String,

        /// Wall-clock time HH:MM
        #[arg(short, long)]
        time: Option<String>,

        /// Calendar date YYYY-MM-DD (required for once)
        #[arg(short, long)]
        date: Option<String>,

        /// Minute interval for every_x_minutes
        #[arg(short, long)]
        interval: Option<u32>,

        /// Generation target or topic (defaults to the description)
        #[arg(long)]
        target: Option<String>,
    },

    /// List tasks
    List {
        /// Filter by status (pending, running, recurring, completed, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Deactivate a task (soft delete)
    Deactivate {
        /// Task ID to deactivate
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        // No args should result in None command (daemon mode)
        let cli = Cli::try_parse_from(["schedr"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["schedr", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["schedr", "-c", "/path/to/schedr.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/schedr.yml")));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["schedr", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn test_tick_command() {
        let cli = Cli::try_parse_from(["schedr", "tick"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Tick)));
    }

    #[test]
    fn test_add_command_defaults() {
        let cli = Cli::try_parse_from(["schedr", "add", "Morning standup"]).unwrap();
        match cli.command {
            Some(Commands::Add {
                description,
                kind,
                frequency,
                time,
                date,
                interval,
                target,
            }) => {
                assert_eq!(description, "Morning standup");
                assert_eq!(kind, "reminder");
                assert_eq!(frequency, "once");
                assert!(time.is_none());
                assert!(date.is_none());
                assert!(interval.is_none());
                assert!(target.is_none());
            }
            _ => panic!("Expected add command"),
        }
    }

    #[test]
    fn test_add_command_full() {
        let cli = Cli::try_parse_from([
            "schedr", "add", "News digest", "-k", "summary", "-f", "daily", "-t", "08:30",
            "--target", "tech news",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Add {
                kind,
                frequency,
                time,
                target,
                ..
            }) => {
                assert_eq!(kind, "summary");
                assert_eq!(frequency, "daily");
                assert_eq!(time, Some("08:30".to_string()));
                assert_eq!(target, Some("tech news".to_string()));
            }
            _ => panic!("Expected add command"),
        }
    }

    #[test]
    fn test_add_command_interval() {
        let cli = Cli::try_parse_from([
            "schedr",
            "add",
            "Poll feed",
            "-f",
            "every_x_minutes",
            "-i",
            "15",
            "-t",
            "09:00",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Add { interval, .. }) => {
                assert_eq!(interval, Some(15));
            }
            _ => panic!("Expected add command"),
        }
    }

    #[test]
    fn test_list_command() {
        let cli = Cli::try_parse_from(["schedr", "list"]).unwrap();
        match cli.command {
            Some(Commands::List { status }) => assert!(status.is_none()),
            _ => panic!("Expected list command"),
        }
    }

    #[test]
    fn test_list_with_status_filter() {
        let cli = Cli::try_parse_from(["schedr", "list", "-s", "recurring"]).unwrap();
        match cli.command {
            Some(Commands::List { status }) => {
                assert_eq!(status, Some("recurring".to_string()));
            }
            _ => panic!("Expected list command"),
        }
    }

    #[test]
    fn test_deactivate_command() {
        let cli = Cli::try_parse_from(["schedr", "deactivate", "task-123"]).unwrap();
        match cli.command {
            Some(Commands::Deactivate { id }) => assert_eq!(id, "task-123"),
            _ => panic!("Expected deactivate command"),
        }
    }

    #[test]
    fn test_help_works() {
        // Verify help doesn't panic
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["schedr", "--version"]);
        // Version flag causes early exit with error (expected)
        assert!(result.is_err());
    }
}
