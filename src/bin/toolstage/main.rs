//! toolstage CLI - staged builds of a compiler toolchain

use anyhow::Result;
use clap::Parser;
use toolstage::core::BuildError;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        let cause = e.chain().find_map(|c| c.downcast_ref::<BuildError>());
        if cause.is_some_and(BuildError::is_invariant_violation) {
            eprintln!("note: builders were chained incorrectly; this is a bug in toolstage");
        }
        // Pass a failing tool's exit status through.
        std::process::exit(cause.and_then(BuildError::exit_code).unwrap_or(1));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("toolstage=debug")
    } else {
        EnvFilter::new("toolstage=info")
    };

    // stdout is reserved for command output and JSON events.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let global = cli::GlobalArgs {
        verbose: cli.verbose,
        config: cli.config,
    };

    match cli.command {
        Commands::Build(args) => commands::build::execute(&global, args),
        Commands::Flags(args) => commands::flags::execute(&global, args),
        Commands::Toolchain(args) => commands::toolchain::execute(&global, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
