//! `hab config` command - Configuration management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::open_project;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., issue_limit)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

const VALID_KEYS: &[(&str, &str)] = &[
    (
        "default_format",
        "Default output format for lists (tsv, json, csv, ...)",
    ),
    (
        "org_structure",
        "YAML file with the organizational tree, relative to the project root",
    ),
    ("issue_limit", "Import issues printed after `hab import`"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn load(global: &GlobalOpts) -> Config {
    let project = open_project(global).ok();
    Config::load_for(project.as_ref())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load(global);

    if let Some(key) = &args.key {
        check_key(key)?;
        return match get_config_value(&config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&config).into_diagnostic()?);
        }
        _ => {
            println!("{}", style("Effective Configuration").bold().underlined());
            println!();
            for (key, _) in VALID_KEYS {
                print_config_value(key, get_config_value(&config, key).as_deref());
            }

            println!();
            println!("{}", style("Config Sources (in priority order):").dim());
            println!("  1. Environment variables (HAB_FORMAT, HAB_ORG_STRUCTURE, HAB_ISSUE_LIMIT)");
            println!("  2. Project config (.hab/config.yaml)");
            println!("  3. Global config (~/.config/hab/config.yaml)");
        }
    }

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let value = match args.key.as_str() {
        "issue_limit" => {
            let n: u64 = args
                .value
                .trim()
                .parse()
                .map_err(|_| miette::miette!("issue_limit must be a non-negative number"))?;
            serde_yml::Value::Number(n.into())
        }
        "default_format" => {
            if OutputFormat::from_name(&args.value).is_none() {
                return Err(miette::miette!("Unknown output format '{}'", args.value));
            }
            serde_yml::Value::String(args.value.trim().to_lowercase())
        }
        _ => serde_yml::Value::String(args.value.clone()),
    };

    let config_path = target_path(args.global, global)?;
    let mut map = read_mapping(&config_path)?;
    map.insert(serde_yml::Value::String(args.key.clone()), value);
    write_mapping(&config_path, map)?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let config_path = target_path(args.global, global)?;
    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut map = read_mapping(&config_path)?;
    if map.remove(args.key.as_str()).is_none() {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    write_mapping(&config_path, map)?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!("  {} {}", style("Global:").cyan(), style("(unavailable)").dim()),
    }

    println!();
    match open_project(global) {
        Ok(project) => print_path("Project:", &project.config_path()),
        Err(_) => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a habilitation project)").dim()
        ),
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<16} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'hab config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            "Unknown configuration key '{}'. Run 'hab config keys' for the list.",
            key
        ))
    }
}

fn target_path(global_scope: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if global_scope {
        Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory"))
    } else {
        Ok(open_project(global)?.config_path())
    }
}

fn read_mapping(path: &PathBuf) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content).into_diagnostic()? {
        serde_yml::Value::Mapping(map) => Ok(map),
        serde_yml::Value::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(miette::miette!("{} is not a YAML mapping", path.display())),
    }
}

fn write_mapping(path: &PathBuf, map: serde_yml::Mapping) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&serde_yml::Value::Mapping(map)).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "default_format" => config.default_format.clone(),
        "org_structure" => config
            .org_structure
            .as_ref()
            .map(|p| p.display().to_string()),
        "issue_limit" => config.issue_limit.map(|n| n.to_string()),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_path(label: &str, path: &std::path::Path) {
    println!("  {} {}", style(label).cyan(), path.display());
    if path.exists() {
        println!("         {}", style("(exists)").green());
    } else {
        println!("         {}", style("(not created)").dim());
    }
}
