//! face-gate CLI - batch face-image quality gate.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::run::RunArgs;
use commands::{Cli, Commands, ExitCode};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = match cli.command {
        Some(Commands::Run(ref args)) => run_batch(args),
        Some(Commands::Labels(ref args)) => match commands::labels::run(args) {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::Error
            }
        },
        None => {
            // Default behavior: run with flattened args
            if cli.run.input.is_none() {
                eprintln!("error: No input directory specified. Use --help for usage information.");
                return ExitCode::Error.into();
            }
            run_batch(&cli.run)
        }
    };

    exit_code.into()
}

fn run_batch(args: &RunArgs) -> ExitCode {
    match commands::run::run(args) {
        Ok(result) => result.exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    }
}
