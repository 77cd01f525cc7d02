//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand, ValueEnum};

use crate::history::{RoundFilter, StatusFilter};
use crate::model::UserRole;

/// Round commands.
#[derive(Debug, Subcommand)]
pub enum RoundCommand {
    /// Record a finished round for a task
    Submit(SubmitArgs),

    /// Show a single round
    Show {
        /// Round id
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments for recording a round.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Id of the task that was executed
    #[arg(short, long)]
    pub task: String,

    /// When the round started (RFC 3339, e.g. 2024-05-01T08:00:00Z)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// When the round ended (defaults to now)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Checklist item ids that were ticked (repeatable)
    #[arg(long = "check", value_name = "ITEM_ID")]
    pub checked: Vec<String>,

    /// Free-text observations
    #[arg(short, long, default_value = "")]
    pub observations: String,

    /// Mark the round as having issues
    #[arg(long)]
    pub issues: bool,

    /// Signature image reference
    #[arg(long)]
    pub signature: Option<String>,

    /// Photo reference (repeatable)
    #[arg(long = "photo", value_name = "REF")]
    pub photos: Vec<String>,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Case-insensitive text to look for in title, sector, responsible or ticket
    #[arg(short, long)]
    pub search: Option<String>,

    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Only this sector
    #[arg(long)]
    pub sector: Option<String>,

    /// Only this responsible party
    #[arg(long)]
    pub responsible: Option<String>,

    /// Filter by the issues flag
    #[arg(long, value_enum, default_value = "all")]
    pub status: StatusArg,

    /// List in stored order (pending rounds first) without filtering or sorting
    #[arg(long, conflicts_with_all = ["search", "since", "until", "sector", "responsible"])]
    pub stored_order: bool,

    /// Maximum number of results
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl HistoryCommand {
    /// Build the library filter from the arguments.
    #[must_use]
    pub fn filter(&self) -> RoundFilter {
        RoundFilter {
            search: self.search.clone(),
            since: self.since,
            until: self.until,
            sector: self.sector.clone(),
            responsible: self.responsible.clone(),
            status: self.status.into(),
        }
    }
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Task commands.
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// List tasks
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a task
    Add {
        /// Sector the task belongs to
        #[arg(long)]
        sector: String,

        /// Task title
        #[arg(long)]
        title: String,

        /// Responsible party
        #[arg(long)]
        responsible: String,

        /// External ticket reference
        #[arg(long)]
        ticket: Option<String>,

        /// Longer description
        #[arg(long, default_value = "")]
        description: String,

        /// Build the checklist from this template id
        #[arg(long, conflicts_with = "items")]
        template: Option<String>,

        /// Checklist item label (repeatable)
        #[arg(long = "item", value_name = "LABEL")]
        items: Vec<String>,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },

    /// Copy a task under a new id
    Duplicate {
        /// Task id
        id: String,
    },
}

/// Template commands.
#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// List checklist templates
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a template
    Add {
        /// Template name
        name: String,

        /// Item label (repeatable)
        #[arg(long = "item", value_name = "LABEL", required = true)]
        items: Vec<String>,
    },

    /// Delete a template
    Delete {
        /// Template id
        id: String,
    },
}

/// User commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List user accounts
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create an account
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Login email
        #[arg(long)]
        email: String,

        /// Login password
        #[arg(long)]
        password: String,

        /// Role of the account
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    /// Allow an account to log in
    Activate {
        /// User id
        id: String,
    },

    /// Prevent an account from logging in
    Deactivate {
        /// User id
        id: String,
    },
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Login email
    pub email: String,

    /// Login password
    #[arg(short, long)]
    pub password: String,
}

/// Report settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show report branding
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change report branding
    Set {
        /// Company name printed in report headers
        #[arg(long)]
        company_name: Option<String>,

        /// Header color (CSS hex)
        #[arg(long)]
        header_color: Option<String>,

        /// Logo image reference
        #[arg(long)]
        logo: Option<String>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Issues-flag filter as a CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Every round
    All,
    /// Rounds with issues
    Issues,
    /// Rounds without issues
    Normal,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => Self::All,
            StatusArg::Issues => Self::Issues,
            StatusArg::Normal => Self::Normal,
        }
    }
}

/// User role as a CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Full access
    Admin,
    /// Executes rounds
    Technician,
    /// Creates tasks and templates
    Analyst,
    /// Reviews reports
    Supervisor,
}

impl From<RoleArg> for UserRole {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Self::Admin,
            RoleArg::Technician => Self::Technician,
            RoleArg::Analyst => Self::Analyst,
            RoleArg::Supervisor => Self::Supervisor,
        }
    }
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One round per line
    Plain,
    /// Aligned columns
    Table,
    /// JSON array
    Json,
}
