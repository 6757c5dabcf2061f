//! `hab init` command - Initialize a new habilitation project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::project::{Project, ProjectError};
use crate::core::store::DB_FILE;
use crate::core::{Config, Store};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .hab/ already exists (keeps the database)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Created directory {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            // Opening the store creates the schema and loads the org tree
            let config = Config::load_for(Some(&project));
            let tree = config
                .org_tree(Some(&project))
                .map_err(|e| miette::miette!("{}", e))?;
            let store = Store::open(&project, &tree).map_err(|e| miette::miette!("{}", e))?;
            let divisions = store
                .list_divisions()
                .map_err(|e| miette::miette!("{}", e))?
                .len();

            if global.quiet {
                return Ok(());
            }
            println!(
                "{} Initialized habilitation project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!(
                "  {} division(s) loaded into the organizational tree",
                style(divisions).cyan()
            );
            println!();
            println!("Next steps:");
            println!(
                "  {} Print an import template",
                style("hab import --template").yellow()
            );
            println!(
                "  {} Import employees and certifications",
                style("hab import staff.tsv").yellow()
            );
            println!(
                "  {} See what needs renewing",
                style("hab renewals").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Habilitation project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("hab init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let files = [".hab/", ".hab/config.yaml", DB_FILE];

    for file in files {
        if root.join(file).exists() {
            let prefix = if file.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(file).dim());
        }
    }
}
