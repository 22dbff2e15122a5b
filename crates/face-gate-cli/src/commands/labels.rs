//! Labels command - list the output folders of every check.

use anyhow::Result;
use clap::Args;
use face_gate_core::CheckKind;
use serde::Serialize;

use crate::output::JsonOutput;

/// Arguments for the labels command
#[derive(Args)]
pub struct LabelsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CheckLabels {
    check: &'static str,
    labels: &'static [&'static str],
}

/// Run the labels command.
pub fn run(args: &LabelsArgs) -> Result<()> {
    let checks: Vec<CheckLabels> = CheckKind::ALL
        .iter()
        .map(|kind| CheckLabels {
            check: kind.name(),
            labels: kind.labels(),
        })
        .collect();

    if args.json {
        let output = JsonOutput::stdout();
        output.write(&checks, true)?;
        return output.flush();
    }

    for check in &checks {
        println!("{}", check.check);
        for label in check.labels {
            println!("  {label}");
        }
    }
    Ok(())
}
