//! `hab emp` command - Employee management

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    confirm, list_format, parse_date, status_style, today, truncate_str, write_csv, Workspace,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::StatusBucket;
use crate::core::org::{Placement, Resolver};
use crate::core::store::{EmployeeFilter, EmployeeRecord, PlacementIds, SortKey};
use crate::entities::certification::{CertClass, CodeSet, NewCertification};
use crate::entities::employee::{EmployeeUpdate, Matricule, NewEmployee};

#[derive(Subcommand, Debug)]
pub enum EmpCommands {
    /// List employees with filtering
    List(ListArgs),

    /// Create a new employee
    New(NewArgs),

    /// Show an employee and its certifications
    Show(ShowArgs),

    /// Edit an employee's identity or placement
    Edit(EditArgs),

    /// Delete an employee and all of its certifications
    Delete(DeleteArgs),
}

/// Filters shared by `emp list` and `cert list`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OwnerFilterArgs {
    /// Search in matricule, names and team
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by division (substring, accent-insensitive)
    #[arg(long)]
    pub division: Option<String>,

    /// Filter by service (substring, accent-insensitive)
    #[arg(long)]
    pub service: Option<String>,

    /// Filter by team (substring, accent-insensitive)
    #[arg(long)]
    pub team: Option<String>,
}

impl OwnerFilterArgs {
    pub fn to_filter(&self) -> EmployeeFilter {
        EmployeeFilter {
            search: self.search.clone(),
            division: self.division.clone(),
            service: self.service.clone(),
            team: self.team.clone(),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: OwnerFilterArgs,

    /// Only employees holding a certification in this status
    /// (expired, critical, warning, notice, valid)
    #[arg(long, short = 's')]
    pub status: Option<StatusBucket>,

    /// Sort by field (matricule, name, expiration)
    #[arg(long, default_value = "matricule")]
    pub sort: SortKey,

    /// Reverse sort order
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
    /// Five-digit matricule
    #[arg(long, short = 'm')]
    pub matricule: Option<String>,

    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Division name or id
    #[arg(long)]
    pub division: Option<String>,

    /// Service name or id
    #[arg(long)]
    pub service: Option<String>,

    /// Team name or id
    #[arg(long)]
    pub team: Option<String>,

    /// HT codes to certify (e.g. "H1V,B1V")
    #[arg(long)]
    pub ht: Option<String>,

    /// ST codes to certify (e.g. "H1N")
    #[arg(long)]
    pub st: Option<String>,

    /// Validation date of the certifications (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub validated: Option<NaiveDate>,

    /// Certificate number
    #[arg(long)]
    pub numero: Option<String>,

    /// Interactive mode (prompt for missing fields)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Matricule or numeric id
    pub key: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Matricule or numeric id
    pub key: String,

    /// New matricule
    #[arg(long, short = 'm')]
    pub matricule: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// Division name or id
    #[arg(long)]
    pub division: Option<String>,

    /// Service name or id
    #[arg(long)]
    pub service: Option<String>,

    /// Team name or id
    #[arg(long)]
    pub team: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Matricule or numeric id
    pub key: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Run an employee subcommand
pub fn run(cmd: EmpCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        EmpCommands::List(args) => run_list(args, global),
        EmpCommands::New(args) => run_new(args, global),
        EmpCommands::Show(args) => run_show(args, global),
        EmpCommands::Edit(args) => run_edit(args, global),
        EmpCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);

    let mut records = ws
        .store
        .list_employee_records(&args.filter.to_filter())
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(bucket) = args.status {
        records.retain(|r| r.has_status(bucket, today));
    }

    args.sort.sort(&mut records);
    if args.reverse {
        records.reverse();
    }

    if let Some(limit) = args.limit {
        records.truncate(limit);
    }

    if args.count {
        println!("{}", records.len());
        return Ok(());
    }

    if records.is_empty() {
        println!("No employees found.");
        return Ok(());
    }

    match list_format(global, &ws.config) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&records).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&records).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => {
            let header = [
                "id", "matricule", "first_name", "last_name", "division", "service", "team",
                "ht", "st", "next_expiration",
            ];
            let rows = records.iter().map(|r| {
                let e = &r.employee;
                [
                    e.id.to_string(),
                    e.matricule.to_string(),
                    e.first_name.clone(),
                    e.last_name.clone(),
                    e.division.clone(),
                    e.service.clone(),
                    e.team.clone(),
                    r.codes(CertClass::Ht).join(";"),
                    r.codes(CertClass::St).join(";"),
                    r.earliest_expiration()
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                ]
            });
            write_csv(std::io::stdout(), &header, rows)?;
        }
        OutputFormat::Md => {
            println!("| ID | Matricule | Name | Division | Team | HT | ST | Next expiration |");
            println!("|---|---|---|---|---|---|---|---|");
            for r in &records {
                let e = &r.employee;
                println!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} |",
                    e.id,
                    e.matricule,
                    e.full_name(),
                    e.division,
                    e.team,
                    r.codes(CertClass::Ht).join(", "),
                    r.codes(CertClass::St).join(", "),
                    r.earliest_expiration()
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        OutputFormat::Id => {
            for r in &records {
                println!("{}", r.employee.matricule);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<6} {:<9} {:<24} {:<30} {:<22} {:<16} {:<8} {}",
                style("ID").bold(),
                style("MAT").bold(),
                style("NAME").bold(),
                style("DIVISION").bold(),
                style("TEAM").bold(),
                style("HT").bold(),
                style("ST").bold(),
                style("NEXT").bold()
            );
            println!("{}", "-".repeat(125));

            for r in &records {
                let e = &r.employee;
                let next = match r.earliest_expiration() {
                    Some(date) => {
                        let bucket = crate::core::lifecycle::classify(date, today);
                        status_style(bucket, date.to_string()).to_string()
                    }
                    None => style("-".to_string()).dim().to_string(),
                };
                println!(
                    "{:<6} {:<9} {:<24} {:<30} {:<22} {:<16} {:<8} {}",
                    style(e.id).cyan(),
                    e.matricule,
                    truncate_str(&e.full_name(), 22),
                    truncate_str(&e.division, 28),
                    truncate_str(&e.team, 20),
                    truncate_str(&r.codes(CertClass::Ht).join(","), 14),
                    truncate_str(&r.codes(CertClass::St).join(","), 6),
                    next
                );
            }

            println!();
            println!("{} employee(s) found.", style(records.len()).cyan());
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let theme = ColorfulTheme::default();

    let prompt = |value: Option<String>, label: &str| -> Result<String> {
        match value {
            Some(v) => Ok(v),
            None if args.interactive => Input::with_theme(&theme)
                .with_prompt(label)
                .interact_text()
                .into_diagnostic(),
            None => Err(miette::miette!(
                "--{} is required (or use --interactive)",
                label.to_lowercase().replace(' ', "-")
            )),
        }
    };

    let matricule = prompt(args.matricule.clone(), "Matricule")?;
    let first_name = prompt(args.first_name.clone(), "First name")?;
    let last_name = prompt(args.last_name.clone(), "Last name")?;

    let placement = match (&args.division, &args.service, &args.team) {
        (Some(d), Some(s), Some(t)) => placement_arg(&ws, d, s, t)?,
        _ if args.interactive => select_placement(&ws, &theme)?,
        _ => {
            return Err(miette::miette!(
                "--division, --service and --team are required (or use --interactive)"
            ))
        }
    };

    let matricule = Matricule::parse(&matricule).map_err(|e| miette::miette!("{}", e))?;
    let mut new = NewEmployee::new(matricule, first_name, last_name, placement)
        .map_err(|e| miette::miette!("{}", e))?;

    for (class, codes) in [(CertClass::Ht, &args.ht), (CertClass::St, &args.st)] {
        let Some(codes) = codes else { continue };
        let validated = args
            .validated
            .ok_or_else(|| miette::miette!("--validated is required with --ht/--st"))?;
        let codes = CodeSet::parse(class, codes).map_err(|e| miette::miette!("{}", e))?;
        new = new.with_certification(
            NewCertification::new(class, codes, validated).with_numero(args.numero.clone()),
        );
    }

    let employee = ws
        .store
        .create_employee(&new)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", employee.id);
        return Ok(());
    }
    println!(
        "{} Created employee {}",
        style("✓").green(),
        style(&employee.matricule).cyan()
    );
    println!("   Name: {}", style(employee.full_name()).yellow());
    println!("   Placement: {}", employee.placement());
    if !new.certifications.is_empty() {
        println!("   Certifications: {}", new.certifications.len());
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);

    let employee = ws
        .store
        .lookup_employee(&args.key)
        .map_err(|e| miette::miette!("{}", e))?;
    let ids = ws
        .store
        .certification_ids_for(employee.id)
        .map_err(|e| miette::miette!("{}", e))?;
    let certifications = ids
        .into_iter()
        .map(|id| ws.store.get_certification(id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| miette::miette!("{}", e))?;
    let record = EmployeeRecord {
        employee,
        certifications,
    };

    match global.format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&record).into_diagnostic()?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
        OutputFormat::Id => {
            println!("{}", record.employee.id);
        }
        _ => {
            let e = &record.employee;
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(e.id).cyan());
            println!("{}: {}", style("Matricule").bold(), style(&e.matricule).cyan());
            println!("{}: {}", style("Name").bold(), style(e.full_name()).yellow());
            println!("{}: {}", style("Division").bold(), e.division);
            println!("{}: {}", style("Service").bold(), e.service);
            println!("{}: {}", style("Team").bold(), e.team);
            println!("{}", style("─".repeat(60)).dim());

            println!();
            if record.certifications.is_empty() {
                println!("{}", style("No certifications.").dim());
            } else {
                println!(
                    "{} ({}):",
                    style("Certifications").bold(),
                    record.certifications.len()
                );
                for cert in &record.certifications {
                    let bucket = cert.status(today);
                    println!(
                        "  • [{}] {} {}  validated {}  expires {} ({})",
                        style(cert.id).cyan(),
                        cert.class,
                        cert.codes,
                        cert.validated_on,
                        status_style(bucket, cert.expires_on),
                        status_style(bucket, bucket.label())
                    );
                    if let Some(ref numero) = cert.numero {
                        println!("      N°: {}", numero);
                    }
                    if let Some(ref doc) = cert.document {
                        println!("      Document: {}", style(doc).dim());
                    }
                }
            }

            println!();
            println!(
                "{}: {}",
                style("Created").dim(),
                style(e.created_at.format("%Y-%m-%d %H:%M")).dim()
            );
            println!(
                "{}: {}",
                style("Updated").dim(),
                style(e.updated_at.format("%Y-%m-%d %H:%M")).dim()
            );
        }
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    let current = ws
        .store
        .lookup_employee(&args.key)
        .map_err(|e| miette::miette!("{}", e))?;

    let nothing_to_do = args.matricule.is_none()
        && args.first_name.is_none()
        && args.last_name.is_none()
        && args.division.is_none()
        && args.service.is_none()
        && args.team.is_none();
    if nothing_to_do {
        return Err(miette::miette!(
            "Nothing to change. Pass --matricule, --first-name, --last-name, --division, --service or --team"
        ));
    }

    let placement = if args.division.is_some() || args.service.is_some() || args.team.is_some() {
        placement_arg(
            &ws,
            args.division.as_deref().unwrap_or(&current.division),
            args.service.as_deref().unwrap_or(&current.service),
            args.team.as_deref().unwrap_or(&current.team),
        )?
    } else {
        current.placement()
    };

    let matricule = match args.matricule {
        Some(ref m) => Matricule::parse(m),
        None => Matricule::parse(&current.matricule),
    }
    .map_err(|e| miette::miette!("{}", e))?;

    let update = EmployeeUpdate {
        matricule,
        first_name: args.first_name.unwrap_or_else(|| current.first_name.clone()),
        last_name: args.last_name.unwrap_or_else(|| current.last_name.clone()),
        placement,
    };

    let updated = ws
        .store
        .update_employee(current.id, &update)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Updated employee {}",
        style("✓").green(),
        style(&updated.matricule).cyan()
    );
    println!("   Name: {}", style(updated.full_name()).yellow());
    println!("   Placement: {}", updated.placement());

    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    let employee = ws
        .store
        .lookup_employee(&args.key)
        .map_err(|e| miette::miette!("{}", e))?;
    let certs = ws
        .store
        .certification_ids_for(employee.id)
        .map_err(|e| miette::miette!("{}", e))?
        .len();

    if !args.yes {
        println!(
            "Deleting {} {} and {} certification(s).",
            style(&employee.matricule).cyan(),
            style(employee.full_name()).yellow(),
            certs
        );
        if !confirm("Proceed?")? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let deleted = ws
        .store
        .delete_employee(employee.id)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Deleted employee {} ({} certification(s) removed)",
        style("✓").green(),
        style(&deleted.matricule).cyan(),
        certs
    );

    Ok(())
}

/// Placement from three numeric ids, or from three exact (normalized) names
fn placement_arg(ws: &Workspace, division: &str, service: &str, team: &str) -> Result<Placement> {
    let ids = (
        division.trim().parse::<i64>(),
        service.trim().parse::<i64>(),
        team.trim().parse::<i64>(),
    );
    if let (Ok(division_id), Ok(service_id), Ok(team_id)) = ids {
        return ws
            .store
            .placement_from_ids(PlacementIds {
                division_id,
                service_id,
                team_id,
            })
            .map_err(|e| miette::miette!("{}", e));
    }

    Resolver::new(&ws.tree)
        .resolve_exact(division, service, team)
        .map_err(|failure| {
            miette::miette!(
                "{} in '{} / {} / {}'. Run 'hab org' for the canonical names",
                failure,
                division,
                service,
                team
            )
        })
}

fn select_placement(ws: &Workspace, theme: &ColorfulTheme) -> Result<Placement> {
    let placements = ws.tree.placements();
    let items: Vec<String> = placements.iter().map(|p| p.to_string()).collect();
    let selection = Select::with_theme(theme)
        .with_prompt("Placement")
        .items(&items)
        .default(0)
        .interact()
        .into_diagnostic()?;
    placements
        .into_iter()
        .nth(selection)
        .ok_or_else(|| miette::miette!("no placement selected"))
}
