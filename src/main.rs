use clap::Parser;
use habtrack::cli::{Cli, Commands, GlobalOpts};
use miette::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(&global);

    match cli.command {
        Commands::Init(args) => habtrack::cli::commands::init::run(args, &global),
        Commands::Org(args) => habtrack::cli::commands::org::run(args, &global),
        Commands::Emp(cmd) => habtrack::cli::commands::emp::run(cmd, &global),
        Commands::Cert(cmd) => habtrack::cli::commands::cert::run(cmd, &global),
        Commands::Bulk(cmd) => habtrack::cli::commands::bulk::run(cmd, &global),
        Commands::Import(args) => habtrack::cli::commands::import::run(args, &global),
        Commands::Export(args) => habtrack::cli::commands::export::run(args, &global),
        Commands::Renewals(args) => habtrack::cli::commands::renewals::run(args, &global),
        Commands::Status(args) => habtrack::cli::commands::status::run(args, &global),
        Commands::Config(cmd) => habtrack::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => habtrack::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; `HAB_LOG` takes an EnvFilter directive
fn init_tracing(global: &GlobalOpts) {
    let default = if global.verbose {
        "habtrack=debug"
    } else {
        "habtrack=warn"
    };
    let filter = EnvFilter::try_from_env("HAB_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
