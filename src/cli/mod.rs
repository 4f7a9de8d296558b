//! CLI module for schedr - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the daemon,
//! triggering ticks, and managing tasks.

pub mod commands;

pub use commands::Cli;
