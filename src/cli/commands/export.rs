//! `hab export` command - CSV exports with spreadsheet column names

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::commands::emp::OwnerFilterArgs;
use crate::cli::helpers::{today, Workspace};
use crate::cli::GlobalOpts;
use crate::core::lifecycle::{StatusBucket, RENEWAL_WINDOW_DAYS};
use crate::core::store::EmployeeRecord;
use crate::entities::certification::{CertClass, CertificationRow};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportKind {
    /// One row per employee with its HT and ST codes
    Employees,
    /// One row per certification due within the renewal window
    Renewals,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// What to export
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Output file (default: standard output)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filter: OwnerFilterArgs,
}

const EMPLOYEE_HEADERS: [&str; 9] = [
    "Matricule",
    "Prénom",
    "Nom",
    "Division",
    "Service",
    "Équipe",
    "Habilitations HT",
    "Habilitations ST",
    "Total Habilitations",
];

const RENEWAL_HEADERS: [&str; 13] = [
    "Matricule",
    "Nom",
    "Prénom",
    "Division",
    "Service",
    "Équipe",
    "Type",
    "Codes",
    "N° Titre",
    "Date Validation",
    "Date Expiration",
    "Jours Restants",
    "Catégorie",
];

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);
    let filter = args.filter.to_filter();

    let sink: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(
            std::fs::File::create(path)
                .map_err(|e| miette::miette!("Cannot create {}: {}", path.display(), e))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = csv::Writer::from_writer(sink);

    let written = match args.kind {
        ExportKind::Employees => {
            let records = ws
                .store
                .list_employee_records(&filter)
                .map_err(|e| miette::miette!("{}", e))?;
            writer.write_record(EMPLOYEE_HEADERS).into_diagnostic()?;
            for record in &records {
                writer.write_record(employee_record(record)).into_diagnostic()?;
            }
            records.len()
        }
        ExportKind::Renewals => {
            let rows: Vec<CertificationRow> = ws
                .store
                .list_renewals(RENEWAL_WINDOW_DAYS, today)
                .map_err(|e| miette::miette!("{}", e))?
                .into_iter()
                .filter(|r| filter.matches_row(r))
                .collect();
            writer.write_record(RENEWAL_HEADERS).into_diagnostic()?;
            for row in &rows {
                writer.write_record(renewal_record(row)).into_diagnostic()?;
            }
            rows.len()
        }
    };
    writer.flush().into_diagnostic()?;

    if let Some(ref path) = args.output {
        if !global.quiet {
            println!(
                "{} Exported {} row(s) to {}",
                style("✓").green(),
                style(written).cyan(),
                style(path.display()).cyan()
            );
        }
    }

    Ok(())
}

fn class_codes(record: &EmployeeRecord, class: CertClass) -> String {
    record
        .certifications
        .iter()
        .filter(|c| c.class == class)
        .map(|c| c.codes.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn employee_record(record: &EmployeeRecord) -> Vec<String> {
    let e = &record.employee;
    vec![
        e.matricule.clone(),
        e.first_name.clone(),
        e.last_name.clone(),
        e.division.clone(),
        e.service.clone(),
        e.team.clone(),
        class_codes(record, CertClass::Ht),
        class_codes(record, CertClass::St),
        record.certifications.len().to_string(),
    ]
}

fn renewal_record(row: &CertificationRow) -> Vec<String> {
    let c = &row.certification;
    vec![
        row.matricule.clone(),
        row.last_name.clone(),
        row.first_name.clone(),
        row.division.clone(),
        row.service.clone(),
        row.team.clone(),
        format!("Habilitation {}", c.class),
        c.codes.to_string(),
        c.numero.clone().unwrap_or_default(),
        c.validated_on.to_string(),
        c.expires_on.to_string(),
        row.days_remaining.to_string(),
        category(row.status).to_string(),
    ]
}

fn category(bucket: StatusBucket) -> &'static str {
    match bucket {
        StatusBucket::Critical => "Expire dans 1 mois",
        StatusBucket::Warning => "Expire dans 2 mois",
        StatusBucket::Notice => "Expire dans 3 mois",
        StatusBucket::Expired => "Expirée",
        StatusBucket::Valid => "Valide",
    }
}
