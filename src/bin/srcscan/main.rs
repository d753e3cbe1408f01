//! srcscan CLI - scan C headers for symbols, types and annotations

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Settings;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("srcscan=debug")
    } else {
        EnvFilter::new("srcscan=info")
    };

    // stdout carries the scan output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Scan(args) => {
            let settings = Settings::load(cli.config.as_deref(), cli.no_color)?;
            commands::scan::execute(args, &settings)
        }
        Commands::Directives(args) => {
            let settings = Settings::load(cli.config.as_deref(), cli.no_color)?;
            commands::directives::execute(args, &settings)
        }
        Commands::Macros(args) => commands::macros::execute(args),
        Commands::Shlibs(args) => commands::shlibs::execute(args),
        Commands::Attrs(args) => commands::attrs::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
