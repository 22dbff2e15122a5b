//! CLI command definitions and handlers.

pub mod labels;
pub mod run;

use clap::{Parser, Subcommand};

/// face-gate - batch face-image quality gate
#[derive(Parser)]
#[command(name = "face-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared run arguments (input, output, scheduling).
    #[command(flatten)]
    pub run: run::RunArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Check every image under a directory and sort copies by outcome
    Run(run::RunArgs),
    /// Print the output folder labels of every check
    Labels(labels::LabelsArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every image processed and every output written.
    Success = 0,
    /// The batch completed but some copies or report writes failed.
    WriteFailures = 1,
    /// Setup failed; nothing was processed.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
