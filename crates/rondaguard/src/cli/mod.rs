//! Command-line interface for rondaguard.
//!
//! This module provides the CLI structure for the `ronda` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, HistoryCommand, LoginCommand, OutputFormat, ReportCommand, RoleArg,
    RoundCommand, SettingsCommand, StatusArg, StatusCommand, SubmitArgs, TaskCommand,
    TemplateCommand, UserCommand,
};

/// ronda - Inspection rounds that keep working offline
///
/// Records checklist rounds locally, queues them while disconnected and
/// merges them into the history once connectivity returns.
#[derive(Debug, Parser)]
#[command(name = "ronda")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Treat the device as disconnected for this invocation
    #[arg(long, global = true)]
    pub offline: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record and inspect rounds
    #[command(subcommand)]
    Round(RoundCommand),

    /// List round history
    History(HistoryCommand),

    /// Merge queued rounds into the history
    Sync,

    /// Show connectivity and queue status
    Status(StatusCommand),

    /// Show aggregate statistics
    Report(ReportCommand),

    /// Manage inspection tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage checklist templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Manage user accounts
    #[command(subcommand)]
    User(UserCommand),

    /// Check credentials
    Login(LoginCommand),

    /// View or change report branding
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
