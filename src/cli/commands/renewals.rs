//! `hab renewals` command - Certifications due for renewal

use console::style;
use miette::Result;

use crate::cli::commands::cert::print_rows;
use crate::cli::helpers::{list_format, today, Workspace};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct RenewalsArgs {
    /// Window in months: 1 (30 days), 2 (60 days) or 3 (90 days)
    #[arg(long, short = 'w', default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub window: u8,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

pub fn run(args: RenewalsArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let today = today(global);
    let max_days = i64::from(args.window) * 30;

    let mut rows = ws
        .store
        .list_renewals(max_days, today)
        .map_err(|e| miette::miette!("{}", e))?;
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if args.count {
        println!("{}", rows.len());
        return Ok(());
    }

    if rows.is_empty() {
        println!(
            "{}",
            style(format!("Nothing to renew within {} days.", max_days)).green()
        );
        return Ok(());
    }

    print_rows(
        &rows,
        list_format(global, &ws.config),
        &format!("certification(s) expiring within {} days.", max_days),
    )
}
