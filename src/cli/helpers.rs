//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use chrono::NaiveDate;
use console::{style, StyledObject};
use miette::{IntoDiagnostic, Result};
use std::io::{self, Write};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::{parse_iso_date, StatusBucket};
use crate::core::org::OrgTree;
use crate::core::{Config, Project, Store};

/// An opened project: configuration, organizational tree and database
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub tree: OrgTree,
    pub store: Store,
}

impl Workspace {
    /// Open the project named by `--project`, or the one found from the current directory
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = open_project(global)?;
        let config = Config::load_for(Some(&project));
        let tree = config.org_tree(Some(&project)).map_err(|e| miette::miette!("{}", e))?;
        let store = Store::open(&project, &tree).map_err(|e| miette::miette!("{}", e))?;
        Ok(Self {
            project,
            config,
            tree,
            store,
        })
    }
}

pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    match global.project {
        Some(ref root) => Project::at(root),
        None => Project::discover(),
    }
    .map_err(|e| miette::miette!("{}", e))
}

/// Reference date: `--today` / `HAB_TODAY`, else the local calendar date
pub fn today(global: &GlobalOpts) -> NaiveDate {
    global
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Resolve `Auto` for list-like output: configured default, else TSV
pub fn list_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    match global.format {
        OutputFormat::Auto => config
            .default_format
            .as_deref()
            .and_then(OutputFormat::from_name)
            .filter(|f| *f != OutputFormat::Auto)
            .unwrap_or(OutputFormat::Tsv),
        f => f,
    }
}

/// clap value parser for YYYY-MM-DD arguments
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_iso_date(s).map_err(|e| e.to_string())
}

/// Ask a yes/no question on stdout; anything but "y" declines
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush().into_diagnostic()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input).into_diagnostic()?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Color a piece of text by expiration status
pub fn status_style<D>(bucket: StatusBucket, text: D) -> StyledObject<D> {
    match bucket {
        StatusBucket::Expired => style(text).red().bold(),
        StatusBucket::Critical => style(text).red(),
        StatusBucket::Warning => style(text).yellow(),
        StatusBucket::Notice => style(text).cyan(),
        StatusBucket::Valid => style(text).green(),
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Write a header row and records as RFC 4180 CSV
pub fn write_csv<W, I, R>(sink: W, header: &[&str], records: I) -> Result<()>
where
    W: std::io::Write,
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(header).into_diagnostic()?;
    for record in records {
        writer.write_record(record).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(format: OutputFormat) -> GlobalOpts {
        GlobalOpts {
            format,
            quiet: false,
            verbose: false,
            project: None,
            today: None,
        }
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("Équipe Électricité", 9), "Équipe...");
    }

    #[test]
    fn test_write_csv_quotes_when_needed() {
        let mut out = Vec::new();
        let rows = vec![
            vec!["simple".to_string(), "with,comma".to_string()],
            vec!["with\"quote".to_string(), "with\nnewline".to_string()],
        ];
        write_csv(&mut out, &["a", "b"], rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a,b\nsimple,\"with,comma\"\n\"with\"\"quote\",\"with\nnewline\"\n"
        );
    }

    #[test]
    fn test_list_format_uses_config_default() {
        let config = Config {
            default_format: Some("JSON".to_string()),
            ..Default::default()
        };
        assert_eq!(list_format(&global(OutputFormat::Auto), &config), OutputFormat::Json);
        assert_eq!(list_format(&global(OutputFormat::Csv), &config), OutputFormat::Csv);
        assert_eq!(
            list_format(&global(OutputFormat::Auto), &Config::default()),
            OutputFormat::Tsv
        );
    }

    #[test]
    fn test_today_prefers_flag() {
        let mut opts = global(OutputFormat::Auto);
        opts.today = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert_eq!(today(&opts), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }
}
