//! `hab import` command - Bulk import from TSV/CSV files and spreadsheet workbooks
//!
//! Rows that cannot be imported are reported with a reason; they never stop
//! the rest of the file from being processed.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{truncate_str, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::import::{
    import_table, is_workbook, read_delimited, read_workbook, template_header, Delimiter, ImportOptions,
    ImportReport, ImportTable,
};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Input file (.tsv, .csv or a workbook such as .xlsx); `-` reads standard input
    #[arg(required_unless_present = "template")]
    pub file: Option<PathBuf>,

    /// Field delimiter (default: from the file extension, tab unless .csv)
    #[arg(long, short = 'd', value_enum)]
    pub delimiter: Option<Delimiter>,

    /// Validate and resolve every row without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print a header row with the recognized column names and exit
    #[arg(long)]
    pub template: bool,

    /// Number of issues to print (default: config issue_limit)
    #[arg(long)]
    pub issues: Option<usize>,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        println!("{}", template_header(args.delimiter.unwrap_or(Delimiter::Tab)));
        return Ok(());
    }

    let Some(path) = args.file else {
        return Err(miette::miette!("an input file is required"));
    };
    let mut ws = Workspace::open(global)?;

    let table = if path.as_os_str() != "-" && is_workbook(&path) {
        read_workbook(&path).map_err(|e| miette::miette!("{}", e))?
    } else {
        read_text_table(&path, args.delimiter)?
    };
    if table.rows.is_empty() {
        println!("{}", style("No data rows found.").yellow());
        return Ok(());
    }

    let options = ImportOptions {
        dry_run: args.dry_run,
    };
    let report = import_table(&mut ws.store, &ws.tree, &table, options);

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        return Ok(());
    }

    let limit = args.issues.unwrap_or_else(|| ws.config.issue_limit());
    print_report(&report, table.rows.len(), args.dry_run, limit);
    Ok(())
}

fn read_text_table(path: &Path, delimiter: Option<Delimiter>) -> Result<ImportTable> {
    let is_stdin = path.as_os_str() == "-";
    let delimiter = delimiter.unwrap_or_else(|| {
        if is_stdin {
            Delimiter::Tab
        } else {
            Delimiter::from_path(path)
        }
    });
    let bytes = if is_stdin {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).into_diagnostic()?;
        buf
    } else {
        std::fs::read(path)
            .map_err(|e| miette::miette!("Cannot read {}: {}", path.display(), e))?
    };
    let text = decode(bytes);

    read_delimited(&text, delimiter).map_err(|e| miette::miette!("{}", e))
}

/// UTF-8 when valid, otherwise Latin-1 (older spreadsheet exports)
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn print_report(report: &ImportReport, rows: usize, dry_run: bool, limit: usize) {
    let verb = if dry_run {
        style("Would import").yellow()
    } else {
        style("Imported").green()
    };
    println!(
        "{} {} of {} row(s)",
        verb,
        style(report.imported).cyan(),
        rows
    );
    if report.corrected > 0 {
        println!(
            "  {} with corrected division/service/team names",
            style(report.corrected).cyan()
        );
    }
    if report.skipped > 0 {
        println!("  {} skipped", style(report.skipped).red());
    }

    if report.issues.is_empty() || limit == 0 {
        return;
    }

    println!();
    let mut builder = Builder::default();
    builder.push_record(["Line", "Identifier", "Division", "Service", "Team", "Reason"]);
    for issue in report.issues.iter().take(limit) {
        builder.push_record([
            issue.line.to_string(),
            issue.identifier.clone(),
            truncate_str(&issue.division, 24),
            truncate_str(&issue.service, 24),
            truncate_str(&issue.team, 24),
            issue.reason.clone(),
        ]);
    }
    println!("{}", builder.build().with(Style::markdown()).to_string());

    if report.issues.len() > limit {
        println!(
            "{}",
            style(format!(
                "... and {} more. Use --issues N or -f json to see all.",
                report.issues.len() - limit
            ))
            .dim()
        );
    }
}
