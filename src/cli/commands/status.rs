//! `hab status` command - Project status dashboard

use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{status_style, today, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::StatusBucket;
use crate::core::store::{CertFilter, EmployeeFilter};
use crate::entities::certification::CertClass;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Also break certification statuses down per division
    #[arg(long)]
    pub detailed: bool,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);

    let employees = ws
        .store
        .list_employees(&EmployeeFilter::default())
        .map_err(|e| miette::miette!("{}", e))?;
    let certs = ws
        .store
        .list_certifications(&CertFilter::default(), today)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut by_bucket: BTreeMap<StatusBucket, usize> =
        StatusBucket::all().iter().map(|b| (*b, 0)).collect();
    let mut by_class: BTreeMap<String, usize> = CertClass::all()
        .iter()
        .map(|c| (c.to_string(), 0))
        .collect();
    for row in &certs {
        *by_bucket.entry(row.status).or_default() += 1;
        *by_class.entry(row.certification.class.to_string()).or_default() += 1;
    }

    // Division order follows the tree, not the alphabet
    let mut by_division: Vec<(String, usize, BTreeMap<StatusBucket, usize>)> = ws
        .tree
        .divisions
        .iter()
        .map(|d| (d.name.clone(), 0, BTreeMap::new()))
        .collect();
    for employee in &employees {
        if let Some(entry) = by_division.iter_mut().find(|(name, _, _)| *name == employee.division) {
            entry.1 += 1;
        }
    }
    for row in &certs {
        if let Some(entry) = by_division.iter_mut().find(|(name, _, _)| *name == row.division) {
            *entry.2.entry(row.status).or_default() += 1;
        }
    }

    let due: usize = by_bucket
        .iter()
        .filter(|(b, _)| b.is_due())
        .map(|(_, n)| n)
        .sum();

    if global.format == OutputFormat::Json {
        let divisions: Vec<_> = by_division
            .iter()
            .map(|(name, count, buckets)| {
                serde_json::json!({
                    "name": name,
                    "employees": count,
                    "certifications": buckets
                        .iter()
                        .map(|(b, n)| (b.as_str().to_string(), *n))
                        .collect::<BTreeMap<_, _>>(),
                })
            })
            .collect();
        let status = serde_json::json!({
            "today": today.to_string(),
            "employees": employees.len(),
            "certifications": certs.len(),
            "due_for_renewal": due,
            "by_status": by_bucket
                .iter()
                .map(|(b, n)| (b.as_str().to_string(), *n))
                .collect::<BTreeMap<_, _>>(),
            "by_class": by_class,
            "divisions": divisions,
        });
        println!("{}", serde_json::to_string_pretty(&status).into_diagnostic()?);
        return Ok(());
    }

    let width = 60;
    println!("{}", style("Habilitation Status").bold().underlined());
    println!("{}", style(format!("as of {}", today)).dim());
    println!("{}", "═".repeat(width));
    println!();

    println!("  {:<28} {}", "Employees", style(employees.len()).cyan());
    println!("  {:<28} {}", "Certifications", style(certs.len()).cyan());
    for (class, n) in &by_class {
        println!("    {:<26} {}", class, n);
    }
    println!("  {:<28} {}", "Due for renewal (≤ 90 days)", style(due).yellow());
    println!();

    println!("{}", style("CERTIFICATIONS BY STATUS").bold());
    println!("{}", "─".repeat(width));
    for (bucket, n) in &by_bucket {
        println!(
            "  {:<28} {}",
            status_style(*bucket, bucket.label()),
            n
        );
    }
    println!();

    println!("{}", style("EMPLOYEES BY DIVISION").bold());
    println!("{}", "─".repeat(width));
    let mut builder = Builder::default();
    if args.detailed {
        let mut header = vec!["Division".to_string(), "Employees".to_string()];
        header.extend(StatusBucket::all().iter().map(|b| b.label().to_string()));
        builder.push_record(header);
        for (name, count, buckets) in &by_division {
            let mut record = vec![name.clone(), count.to_string()];
            record.extend(
                StatusBucket::all()
                    .iter()
                    .map(|b| buckets.get(b).copied().unwrap_or(0).to_string()),
            );
            builder.push_record(record);
        }
    } else {
        builder.push_record(["Division", "Employees"]);
        for (name, count, _) in &by_division {
            builder.push_record([name.clone(), count.to_string()]);
        }
    }
    println!("{}", builder.build().with(Style::markdown()).to_string());

    Ok(())
}
