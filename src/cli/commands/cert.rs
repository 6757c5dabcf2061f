//! `hab cert` command - Certification management

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::emp::OwnerFilterArgs;
use crate::cli::helpers::{
    confirm, list_format, parse_date, status_style, today, truncate_str, write_csv, Workspace,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::StatusBucket;
use crate::core::store::CertFilter;
use crate::entities::certification::{
    CertClass, CertificationRow, CertificationUpdate, CodeSet, NewCertification,
};

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// List certifications with filtering
    List(ListArgs),

    /// Add a certification to an employee
    New(NewArgs),

    /// Show a certification's details
    Show(ShowArgs),

    /// Change codes, number or dates of a certification
    Edit(EditArgs),

    /// Delete a certification (the employee is kept)
    Delete(DeleteArgs),

    /// Attach a document reference (path or URL)
    Attach(AttachArgs),

    /// Remove the attached document reference
    Detach(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: OwnerFilterArgs,

    /// Only certifications of this employee (matricule or id)
    #[arg(long, short = 'e')]
    pub employee: Option<String>,

    /// Filter by class (ht, st)
    #[arg(long, short = 'c')]
    pub class: Option<CertClass>,

    /// Filter by status (expired, critical, warning, notice, valid)
    #[arg(long, short = 's')]
    pub status: Option<StatusBucket>,

    /// Reverse sort order (latest expiration first)
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Owner (matricule or id)
    pub employee: String,

    /// Certification class (ht, st)
    #[arg(long, short = 'c')]
    pub class: CertClass,

    /// Codes, comma separated (e.g. "H1V,B1V")
    #[arg(long)]
    pub codes: String,

    /// Validation date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub validated: NaiveDate,

    /// Explicit expiration date; computed from the class when absent
    #[arg(long, value_parser = parse_date)]
    pub expires: Option<NaiveDate>,

    /// Certificate number
    #[arg(long)]
    pub numero: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Certification id
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Certification id
    pub id: i64,

    /// Replace the codes (comma separated)
    #[arg(long)]
    pub codes: Option<String>,

    /// New validation date; expiration is recomputed from it
    #[arg(long, value_parser = parse_date)]
    pub validated: Option<NaiveDate>,

    /// Explicit expiration date, overriding the computed one
    #[arg(long, value_parser = parse_date)]
    pub expires: Option<NaiveDate>,

    /// New certificate number
    #[arg(long, conflicts_with = "clear_numero")]
    pub numero: Option<String>,

    /// Remove the certificate number
    #[arg(long)]
    pub clear_numero: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Certification id
    pub id: i64,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct AttachArgs {
    /// Certification id
    pub id: i64,

    /// Document reference (path or URL), stored as given
    pub reference: String,
}

/// Run a certification subcommand
pub fn run(cmd: CertCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CertCommands::List(args) => run_list(args, global),
        CertCommands::New(args) => run_new(args, global),
        CertCommands::Show(args) => run_show(args, global),
        CertCommands::Edit(args) => run_edit(args, global),
        CertCommands::Delete(args) => run_delete(args, global),
        CertCommands::Attach(args) => run_attach(args, global),
        CertCommands::Detach(args) => run_detach(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);

    let employee_id = match args.employee {
        Some(ref key) => Some(
            ws.store
                .lookup_employee(key)
                .map_err(|e| miette::miette!("{}", e))?
                .id,
        ),
        None => None,
    };
    let filter = CertFilter {
        owner: args.filter.to_filter(),
        employee_id,
        class: args.class,
        status: args.status,
    };

    let mut rows = ws
        .store
        .list_certifications(&filter, today)
        .map_err(|e| miette::miette!("{}", e))?;

    if args.reverse {
        rows.reverse();
    }
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if args.count {
        println!("{}", rows.len());
        return Ok(());
    }

    if rows.is_empty() {
        println!("No certifications found.");
        return Ok(());
    }

    print_rows(&rows, list_format(global, &ws.config), "certification(s) found.")
}

/// Render certification rows in any list format
pub(crate) fn print_rows(rows: &[CertificationRow], format: OutputFormat, summary: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(rows).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let header = [
                "id", "matricule", "first_name", "last_name", "team", "class", "codes",
                "validated_on", "expires_on", "days_remaining", "status",
            ];
            let records = rows.iter().map(|r| {
                let c = &r.certification;
                [
                    c.id.to_string(),
                    r.matricule.to_string(),
                    r.first_name.clone(),
                    r.last_name.clone(),
                    r.team.clone(),
                    c.class.to_string(),
                    c.codes.iter().collect::<Vec<_>>().join(";"),
                    c.validated_on.to_string(),
                    c.expires_on.to_string(),
                    r.days_remaining.to_string(),
                    r.status.to_string(),
                ]
            });
            write_csv(std::io::stdout(), &header, records)?;
        }
        OutputFormat::Md => {
            println!("| ID | Matricule | Name | Class | Codes | Expires | Days | Status |");
            println!("|---|---|---|---|---|---|---|---|");
            for r in rows {
                let c = &r.certification;
                println!(
                    "| {} | {} | {} {} | {} | {} | {} | {} | {} |",
                    c.id,
                    r.matricule,
                    r.first_name,
                    r.last_name,
                    c.class,
                    c.codes,
                    c.expires_on,
                    r.days_remaining,
                    r.status.label()
                );
            }
        }
        OutputFormat::Id => {
            for r in rows {
                println!("{}", r.certification.id);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<6} {:<9} {:<24} {:<6} {:<16} {:<11} {:<6} {}",
                style("ID").bold(),
                style("MAT").bold(),
                style("NAME").bold(),
                style("CLASS").bold(),
                style("CODES").bold(),
                style("EXPIRES").bold(),
                style("DAYS").bold(),
                style("STATUS").bold()
            );
            println!("{}", "-".repeat(95));

            for r in rows {
                let c = &r.certification;
                println!(
                    "{:<6} {:<9} {:<24} {:<6} {:<16} {:<11} {:<6} {}",
                    style(c.id).cyan(),
                    r.matricule,
                    truncate_str(&format!("{} {}", r.first_name, r.last_name), 22),
                    c.class,
                    truncate_str(&c.codes.to_string(), 14),
                    c.expires_on,
                    r.days_remaining,
                    status_style(r.status, r.status.label())
                );
            }

            println!();
            println!("{} {}", style(rows.len()).cyan(), summary);
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    let employee = ws
        .store
        .lookup_employee(&args.employee)
        .map_err(|e| miette::miette!("{}", e))?;
    let codes = CodeSet::parse(args.class, &args.codes).map_err(|e| miette::miette!("{}", e))?;
    let new = NewCertification::new(args.class, codes, args.validated)
        .with_numero(args.numero)
        .with_expiration(args.expires);

    let cert = ws
        .store
        .create_certification(employee.id, &new)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", cert.id);
        return Ok(());
    }
    println!(
        "{} Created {} certification {} for {}",
        style("✓").green(),
        cert.class,
        style(cert.id).cyan(),
        style(employee.full_name()).yellow()
    );
    println!("   Codes: {}", cert.codes);
    println!("   Validated: {}  Expires: {}", cert.validated_on, cert.expires_on);

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);

    let row = ws
        .store
        .get_certification_row(args.id, today)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&row).into_diagnostic()?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&row).into_diagnostic()?);
        }
        OutputFormat::Id => {
            println!("{}", row.certification.id);
        }
        _ => {
            let c = &row.certification;
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(c.id).cyan());
            println!(
                "{}: {} {} ({})",
                style("Employee").bold(),
                style(&row.first_name).yellow(),
                style(&row.last_name).yellow(),
                row.matricule
            );
            println!(
                "{}: {} / {} / {}",
                style("Placement").bold(),
                row.division,
                row.service,
                row.team
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("Class").bold(), c.class);
            println!("{}: {}", style("Codes").bold(), c.codes);
            if let Some(ref numero) = c.numero {
                println!("{}: {}", style("N° du titre").bold(), numero);
            }
            println!("{}: {}", style("Validated").bold(), c.validated_on);
            println!(
                "{}: {}",
                style("Expires").bold(),
                status_style(row.status, c.expires_on)
            );
            println!(
                "{}: {} ({} day(s))",
                style("Status").bold(),
                status_style(row.status, row.status.label()),
                row.days_remaining
            );
            if let Some(ref doc) = c.document {
                println!("{}: {}", style("Document").bold(), doc);
            }
        }
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    let numero = if args.clear_numero {
        Some(None)
    } else {
        args.numero.map(Some)
    };
    let update = CertificationUpdate {
        codes: args.codes.as_deref().map(split_codes),
        numero,
        validated_on: args.validated,
        expires_on: args.expires,
    };

    let cert = ws
        .store
        .update_certification(args.id, &update)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Updated {} certification {}",
        style("✓").green(),
        cert.class,
        style(cert.id).cyan()
    );
    println!("   Codes: {}", cert.codes);
    println!("   Validated: {}  Expires: {}", cert.validated_on, cert.expires_on);

    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    if !args.yes {
        let row = ws
            .store
            .get_certification_row(args.id, today(global))
            .map_err(|e| miette::miette!("{}", e))?;
        println!(
            "Deleting {} certification {} ({}) of {} {}.",
            row.certification.class,
            style(row.certification.id).cyan(),
            row.certification.codes,
            row.first_name,
            row.last_name
        );
        if !confirm("Proceed?")? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let cert = ws
        .store
        .delete_certification(args.id)
        .map_err(|e| miette::miette!("{}", e))?;
    println!(
        "{} Deleted certification {}",
        style("✓").green(),
        style(cert.id).cyan()
    );

    Ok(())
}

fn run_attach(args: AttachArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let cert = ws
        .store
        .set_attachment(args.id, &args.reference)
        .map_err(|e| miette::miette!("{}", e))?;
    println!(
        "{} Attached {} to certification {}",
        style("✓").green(),
        style(cert.document.as_deref().unwrap_or_default()).yellow(),
        style(cert.id).cyan()
    );
    Ok(())
}

fn run_detach(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let cert = ws
        .store
        .clear_attachment(args.id)
        .map_err(|e| miette::miette!("{}", e))?;
    println!(
        "{} Removed document from certification {}",
        style("✓").green(),
        style(cert.id).cyan()
    );
    Ok(())
}

/// Split a "H1V, B1V" style list into raw codes for the store to validate
pub(crate) fn split_codes(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
