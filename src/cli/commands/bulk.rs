//! `hab bulk` command - Batch operations on certifications
//!
//! Items are applied one at a time; a failing item is reported and the rest
//! of the batch still runs.

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::commands::cert::split_codes;
use crate::cli::helpers::{confirm, parse_date, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::BatchReport;
use crate::entities::certification::Certification;

#[derive(Subcommand, Debug)]
pub enum BulkCommands {
    /// Renew certifications from one new validation date
    Renew(RenewArgs),

    /// Delete several certifications
    Delete(DeleteArgs),

    /// Attach document references, one ID=REF pair per certification
    Attach(AttachArgs),
}

/// Certification selection shared by renew and delete
#[derive(clap::Args, Debug)]
pub struct Selection {
    /// Certification ids
    #[arg(required_unless_present = "employee")]
    pub ids: Vec<i64>,

    /// Select every certification of this employee (matricule or id)
    #[arg(long, short = 'e')]
    pub employee: Option<String>,

    /// Show what would change without making changes
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct RenewArgs {
    /// New validation date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub validated: NaiveDate,

    /// Replace the codes of every renewed certification (comma separated)
    #[arg(long)]
    pub codes: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct AttachArgs {
    /// ID=REF pairs, e.g. 12=scans/12.pdf
    #[arg(required = true, value_parser = parse_attachment)]
    pub items: Vec<(i64, String)>,
}

fn parse_attachment(s: &str) -> std::result::Result<(i64, String), String> {
    let (id, reference) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=REF, got '{}'", s))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a certification id", id))?;
    Ok((id, reference.to_string()))
}

#[derive(Serialize)]
struct Summary<'a> {
    action: &'a str,
    #[serde(flatten)]
    report: &'a BatchReport<Certification>,
}

pub fn run(cmd: BulkCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BulkCommands::Renew(args) => run_renew(args, global),
        BulkCommands::Delete(args) => run_delete(args, global),
        BulkCommands::Attach(args) => run_attach(args, global),
    }
}

fn collect_ids(ws: &Workspace, selection: &Selection) -> Result<Vec<i64>> {
    let mut ids = selection.ids.clone();
    if let Some(ref key) = selection.employee {
        let employee = ws
            .store
            .lookup_employee(key)
            .map_err(|e| miette::miette!("{}", e))?;
        ids.extend(
            ws.store
                .certification_ids_for(employee.id)
                .map_err(|e| miette::miette!("{}", e))?,
        );
    }
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    Ok(ids)
}

fn run_renew(args: RenewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let ids = collect_ids(&ws, &args.selection)?;

    if ids.is_empty() {
        println!("{}", style("No matching certifications found.").yellow());
        return Ok(());
    }

    if args.selection.dry_run {
        println!(
            "{} {} certification(s) from {}",
            style("Would renew").yellow(),
            style(ids.len()).cyan(),
            style(args.validated).cyan()
        );
        for id in &ids {
            println!("  {} {}", style("*").dim(), style(id).cyan());
        }
        return Ok(());
    }

    let codes = args.codes.as_deref().map(split_codes);
    let report = ws.store.renew_batch(&ids, args.validated, codes.as_deref());

    print_report("renew", &report, global, |cert| {
        format!("{} {} → {}", cert.class, cert.codes, cert.expires_on)
    })
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let ids = collect_ids(&ws, &args.selection)?;

    if ids.is_empty() {
        println!("{}", style("No matching certifications found.").yellow());
        return Ok(());
    }

    if args.selection.dry_run {
        println!(
            "{} {} certification(s)",
            style("Would delete").yellow(),
            style(ids.len()).cyan()
        );
        for id in &ids {
            println!("  {} {}", style("*").dim(), style(id).cyan());
        }
        return Ok(());
    }

    if !args.yes {
        println!("Deleting {} certification(s).", style(ids.len()).cyan());
        if !confirm("Proceed?")? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let report = ws.store.delete_certifications_batch(&ids);
    print_report("delete", &report, global, |cert| {
        format!("{} {}", cert.class, cert.codes)
    })
}

fn run_attach(args: AttachArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let report = ws.store.attach_batch(&args.items);
    print_report("attach", &report, global, |cert| {
        cert.document.clone().unwrap_or_default()
    })
}

fn print_report(
    action: &str,
    report: &BatchReport<Certification>,
    global: &GlobalOpts,
    describe: impl Fn(&Certification) -> String,
) -> Result<()> {
    if global.format == OutputFormat::Json {
        let summary = Summary { action, report };
        println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        return Ok(());
    }

    let verb = match action {
        "renew" => "Renewed:",
        "delete" => "Deleted:",
        _ => "Attached:",
    };

    if !global.quiet {
        for cert in &report.done {
            println!(
                "  {} {} {}",
                style(verb).green(),
                style(cert.id).cyan(),
                style(describe(cert)).dim()
            );
        }
    }
    for failure in &report.failed {
        println!(
            "  {} {} - {}",
            style("Error:").red(),
            style(failure.id).cyan(),
            failure.reason
        );
    }

    println!(
        "\n{} done, {} errors",
        style(report.done.len()).green(),
        style(report.failed.len()).red()
    );
    Ok(())
}
