//! `hab org` command - Organizational structure

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{list_format, write_csv, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::org::{ResolveFailure, Resolver};

#[derive(clap::Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct OrgArgs {
    #[command(subcommand)]
    pub command: Option<OrgCommands>,

    /// Print the nested tree instead of one row per team
    #[arg(long)]
    pub tree: bool,
}

#[derive(Subcommand, Debug)]
pub enum OrgCommands {
    /// Show how free-text names resolve onto the tree
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Division text
    pub division: String,

    /// Service text
    pub service: String,

    /// Team text
    pub team: String,
}

/// One team with its ancestry, as stored
#[derive(Debug, Serialize)]
struct OrgRow {
    division_id: i64,
    division: String,
    service_id: i64,
    service: String,
    team_id: i64,
    team: String,
}

pub fn run(args: OrgArgs, global: &GlobalOpts) -> Result<()> {
    match args.command {
        Some(OrgCommands::Resolve(resolve)) => run_resolve(resolve, global),
        None if args.tree => run_tree(global),
        None => run_list(global),
    }
}

fn load_rows(ws: &Workspace) -> Result<Vec<OrgRow>> {
    let mut rows = Vec::new();
    for division in ws.store.list_divisions().map_err(|e| miette::miette!("{}", e))? {
        for service in ws
            .store
            .list_services(division.id)
            .map_err(|e| miette::miette!("{}", e))?
        {
            for team in ws
                .store
                .list_teams(service.id)
                .map_err(|e| miette::miette!("{}", e))?
            {
                rows.push(OrgRow {
                    division_id: division.id,
                    division: division.name.clone(),
                    service_id: service.id,
                    service: service.name.clone(),
                    team_id: team.id,
                    team: team.name,
                });
            }
        }
    }
    Ok(rows)
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let rows = load_rows(&ws)?;

    match list_format(global, &ws.config) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&rows).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let header = ["division_id", "division", "service_id", "service", "team_id", "team"];
            let records = rows.iter().map(|row| {
                [
                    row.division_id.to_string(),
                    row.division.clone(),
                    row.service_id.to_string(),
                    row.service.clone(),
                    row.team_id.to_string(),
                    row.team.clone(),
                ]
            });
            write_csv(std::io::stdout(), &header, records)?;
        }
        OutputFormat::Md => {
            println!("| Div | Division | Svc | Service | Team | Name |");
            println!("|---|---|---|---|---|---|");
            for row in &rows {
                println!(
                    "| {} | {} | {} | {} | {} | {} |",
                    row.division_id, row.division, row.service_id, row.service, row.team_id, row.team
                );
            }
        }
        OutputFormat::Id => {
            for row in &rows {
                println!("{}", row.team_id);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<5} {:<34} {:<5} {:<26} {:<5} {}",
                style("DIV").bold(),
                style("DIVISION").bold(),
                style("SVC").bold(),
                style("SERVICE").bold(),
                style("TEAM").bold(),
                style("NAME").bold()
            );
            println!("{}", "-".repeat(100));
            for row in &rows {
                println!(
                    "{:<5} {:<34} {:<5} {:<26} {:<5} {}",
                    style(row.division_id).cyan(),
                    row.division,
                    style(row.service_id).cyan(),
                    row.service,
                    style(row.team_id).cyan(),
                    row.team
                );
            }
            println!();
            println!("{} team(s) found.", style(rows.len()).cyan());
        }
    }

    Ok(())
}

fn run_tree(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ws.tree).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&ws.tree).into_diagnostic()?);
            return Ok(());
        }
        _ => {}
    }

    for division in ws.store.list_divisions().map_err(|e| miette::miette!("{}", e))? {
        println!("{} {}", style(format!("[{}]", division.id)).dim(), style(&division.name).bold());
        let services = ws
            .store
            .list_services(division.id)
            .map_err(|e| miette::miette!("{}", e))?;
        for (si, service) in services.iter().enumerate() {
            let last_service = si + 1 == services.len();
            let branch = if last_service { "└──" } else { "├──" };
            println!(
                "{} {} {}",
                branch,
                style(format!("[{}]", service.id)).dim(),
                style(&service.name).cyan()
            );

            let teams = ws
                .store
                .list_teams(service.id)
                .map_err(|e| miette::miette!("{}", e))?;
            let indent = if last_service { "    " } else { "│   " };
            for (ti, team) in teams.iter().enumerate() {
                let twig = if ti + 1 == teams.len() { "└──" } else { "├──" };
                println!("{}{} {} {}", indent, twig, style(format!("[{}]", team.id)).dim(), team.name);
            }
        }
    }

    Ok(())
}

fn run_resolve(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let resolver = Resolver::new(&ws.tree);

    match resolver.resolve(&args.division, &args.service, &args.team) {
        Ok(placement) => {
            if global.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&placement).into_diagnostic()?);
                return Ok(());
            }
            println!("{} {}", style("✓").green(), style(&placement).cyan());
            println!("  {}: {}", style("Division").bold(), placement.division);
            println!("  {}: {}", style("Service").bold(), placement.service);
            println!("  {}: {}", style("Team").bold(), placement.team);
            Ok(())
        }
        Err(failure) => {
            let raw = match failure {
                ResolveFailure::Division => &args.division,
                ResolveFailure::Service => &args.service,
                ResolveFailure::Team => &args.team,
            };
            Err(miette::miette!("{}: '{}'", failure, raw))
        }
    }
}
