//! CLI argument definitions using clap derive

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    bulk::BulkCommands,
    cert::CertCommands,
    completions::CompletionsArgs,
    config::ConfigCommands,
    emp::EmpCommands,
    export::ExportArgs,
    import::ImportArgs,
    init::InitArgs,
    org::OrgArgs,
    renewals::RenewalsArgs,
    status::StatusArgs,
};
use crate::cli::helpers::parse_date;

#[derive(Parser)]
#[command(name = "hab")]
#[command(author, version, about = "Habilitation tracker")]
#[command(long_about = "Track employees, their electrical safety certifications (habilitations) and upcoming renewals in a local project database.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .hab/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Reference date for status computations (default: the system date)
    #[arg(long, global = true, env = "HAB_TODAY", value_parser = parse_date)]
    pub today: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new habilitation project
    Init(InitArgs),

    /// Organizational structure (divisions, services, teams)
    Org(OrgArgs),

    /// Employee management
    #[command(subcommand)]
    Emp(EmpCommands),

    /// Certification management
    #[command(subcommand)]
    Cert(CertCommands),

    /// Bulk operations on multiple certifications
    #[command(subcommand)]
    Bulk(BulkCommands),

    /// Import employees and certifications from a TSV or CSV file
    Import(ImportArgs),

    /// Export employees or renewals as CSV
    Export(ExportArgs),

    /// List certifications due for renewal
    Renewals(RenewalsArgs),

    /// Show project status dashboard
    Status(StatusArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (pretty for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Parse a format name from configuration, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        <OutputFormat as ValueEnum>::from_str(name.trim(), true).ok()
    }
}
