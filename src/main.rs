// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::{CookArgs, Session};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides the default level; -v raises it to debug
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    let json = cli.json;

    match cli.command {
        Commands::Options { target } => {
            commands::cmd_options(&Session::open(&target, config)?, json)
        }
        Commands::Deps { target } => commands::cmd_deps(&Session::open(&target, config)?, json),
        Commands::Check { target } => commands::cmd_check(&Session::open(&target, config)?, json),
        Commands::Plan { target } => commands::cmd_plan(&Session::open(&target, config)?, json),
        Commands::Cook {
            target,
            source_cache,
            jobs,
            keep_builddir,
            fetch_only,
        } => {
            let args = CookArgs {
                source_cache,
                jobs,
                keep_builddir,
                fetch_only,
            };
            commands::cmd_cook(&Session::open(&target, config)?, &args)
        }
    }
}

/// Exit status for a failed run, by error class
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<pantry::Error>())
        .map(|e| e.class().exit_code())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}
