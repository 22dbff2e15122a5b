//! Run command - check a directory of face images and sort copies by outcome.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use face_gate_adapters::{FsImageSource, FsOutcomeRouter, JsonReportWriter, SidecarPerception};
use face_gate_core::checks::CheckOptions;
use face_gate_core::domain::SummaryRow;
use face_gate_core::{BatchRunner, ExecutionMode, ImageWorker, RunOptions, RunSummary};
use serde::Serialize;
use tracing::{debug, info};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Hardcoded defaults for values neither the CLI nor a config file set.
mod defaults {
    pub const WORKERS: usize = 4;
    pub const FLUSH_EVERY: usize = 10;
    pub const OUTPUT_DIR: &str = "output";
}

/// Parse a worker count (at least 1).
fn parse_workers(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid worker count"))?;
    if value == 0 {
        Err("worker count must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Parse a timeout in seconds (positive, finite).
fn parse_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not a positive number of seconds"))
    }
}

/// Shared arguments for a batch run.
#[derive(Args, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Directory tree of images to check
    pub input: Option<PathBuf>,

    /// Output root (default: <INPUT>/output)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Config file applied over the XDG and project configs
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Worker threads
    #[arg(short = 'j', long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Process images one at a time
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,

    /// Write the report after every N images (0 = only at the end)
    #[arg(long, value_name = "N")]
    pub flush_every: Option<usize>,

    /// Abandon an image after this many seconds
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub timeout: Option<f64>,

    /// Directory holding landmark sidecar files (default: next to each image)
    #[arg(long, value_name = "DIR")]
    pub landmarks_dir: Option<PathBuf>,

    /// Measure blur on the detected face only
    #[arg(long)]
    pub blur_face_region: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress and summary output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Check each immediate subfolder of INPUT as its own batch, into
    /// <OUTPUT>/<subfolder>
    #[arg(long)]
    pub per_folder: bool,
}

impl RunArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, project-local, then `--config`)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        // a CLI --workers overrides a config `sequential = true`
        if !args.sequential && args.workers.is_none() {
            args.sequential = config.run.sequential.unwrap_or(false);
        }
        args.workers = args.workers.or(config.run.workers);
        args.flush_every = args.flush_every.or(config.run.flush_every);
        args.timeout = args.timeout.or(config.run.image_timeout_secs);
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }
        if !args.blur_face_region {
            args.blur_face_region = config.blur.face_region.unwrap_or(false);
        }

        if args.output.is_none() {
            args.output.clone_from(&config.output.dir);
        }
        if args.landmarks_dir.is_none() {
            args.landmarks_dir.clone_from(&config.perception.landmarks_dir);
        }

        args
    }

    /// Output root with fallback to `<input>/output`.
    fn output_dir(&self, input: &Path) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| input.join(defaults::OUTPUT_DIR))
    }

    fn mode(&self) -> ExecutionMode {
        if self.sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Pool {
                workers: self.workers.unwrap_or(defaults::WORKERS),
            }
        }
    }

    fn run_options(&self) -> Result<RunOptions> {
        let image_timeout = self
            .timeout
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("Invalid image timeout")?;
        Ok(RunOptions {
            mode: self.mode(),
            flush_every: self.flush_every.unwrap_or(defaults::FLUSH_EVERY),
            image_timeout,
        })
    }
}

/// Result of running the batch.
#[allow(dead_code)] // summaries exposed for programmatic use
pub struct RunResult {
    /// What each batch did; one entry unless `--per-folder` was given.
    pub summaries: Vec<RunSummary>,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Machine-readable run summary printed with `--json`.
#[derive(Serialize)]
struct SummaryReport {
    input: String,
    output: String,
    images: usize,
    rows: usize,
    faulted: usize,
    timed_out: usize,
    write_failures: usize,
    timing_summary: Vec<SummaryRow>,
}

impl SummaryReport {
    fn new(input: &Path, output: &Path, summary: &RunSummary) -> Self {
        Self {
            input: input.display().to_string(),
            output: output.display().to_string(),
            images: summary.images,
            rows: summary.rows,
            faulted: summary.faulted,
            timed_out: summary.timed_out,
            write_failures: summary.write_failures,
            timing_summary: summary.totals.summary_rows(),
        }
    }
}

/// Everything shared by the batches of one invocation.
struct Batch {
    worker: Arc<ImageWorker>,
    options: RunOptions,
    quiet: bool,
    show_progress: bool,
}

impl Batch {
    /// Checks one input tree into one output root.
    fn run(&self, input: &Path, output: &Path) -> Result<RunSummary> {
        let source = FsImageSource::new(input).excluding(output);
        let router = FsOutcomeRouter::new(output);
        let report = JsonReportWriter::new(output);
        let progress = ProgressBar::new(self.quiet, self.show_progress);

        let summary = BatchRunner::new(Arc::clone(&self.worker), self.options).run(
            &source,
            &router,
            &report,
            &progress,
        )?;

        if summary.images == 0 {
            eprintln!("No images found in {}; nothing written.", input.display());
        } else if !self.quiet {
            eprintln!(
                "Processed {} images ({} faulted, {} timed out). Report: {}",
                summary.rows,
                summary.faulted,
                summary.timed_out,
                report.path().display()
            );
        }
        if summary.write_failures > 0 {
            eprintln!(
                "warning: {} output writes failed; see log for details",
                summary.write_failures
            );
        }
        Ok(summary)
    }
}

/// Immediate subfolders of `root`, sorted by name, excluding `output`.
fn subfolders(root: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root)
        .with_context(|| format!("Failed to read input directory: {}", root.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to read input directory: {}", root.display()))?
            .path();
        if path.is_dir() && path != output {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Run the batch command.
///
/// Loads the layered configuration, then processes every image under the
/// input directory, or under each of its subfolders with `--per-folder`.
pub fn run(args: &RunArgs) -> Result<RunResult> {
    let Some(input) = args.input.clone() else {
        bail!("No input directory specified. Use --help for usage information.");
    };

    let config = AppConfig::load(args.config_file.as_deref())?;
    config.validate().map_err(anyhow::Error::msg)?;
    let thresholds = config.threshold.resolve().map_err(anyhow::Error::msg)?;
    let args = RunArgs::with_config(args.clone(), &config);
    debug!("Thresholds: {thresholds:?}");

    if !input.is_dir() {
        bail!("Input directory does not exist: {}", input.display());
    }
    let output = args.output_dir(&input);
    let options = args.run_options()?;
    info!(
        "Checking {} into {} ({:?})",
        input.display(),
        output.display(),
        options.mode
    );

    let perception = args
        .landmarks_dir
        .as_ref()
        .map_or_else(SidecarPerception::new, SidecarPerception::with_landmarks_dir);
    let batch = Batch {
        worker: Arc::new(ImageWorker::with_thresholds(
            Arc::new(perception),
            &thresholds,
            CheckOptions {
                blur_face_region: args.blur_face_region,
            },
        )),
        options,
        quiet: args.quiet,
        show_progress: !args.quiet && (args.progress || std::io::stderr().is_terminal()),
    };

    let mut reports = Vec::new();
    let mut summaries = Vec::new();
    if args.per_folder {
        let folders = subfolders(&input, &output)?;
        if folders.is_empty() {
            bail!("No folders found in {}", input.display());
        }
        if !args.quiet {
            eprintln!("Processing {} folders", folders.len());
        }
        for folder in &folders {
            let name = folder.file_name().unwrap_or_default();
            let folder_output = output.join(name);
            let summary = batch.run(folder, &folder_output)?;
            if !args.quiet {
                eprintln!("Folder '{}': {} images", name.to_string_lossy(), summary.images);
                if summary.images > 0 {
                    eprintln!("  Completed: {} images processed", summary.rows);
                }
            }
            reports.push(SummaryReport::new(folder, &folder_output, &summary));
            summaries.push(summary);
        }
        if !args.quiet {
            eprintln!(
                "Total processing complete: {} images across {} folders",
                summaries.iter().map(|s| s.images).sum::<usize>(),
                folders.len()
            );
        }
    } else {
        let summary = batch.run(&input, &output)?;
        reports.push(SummaryReport::new(&input, &output, &summary));
        summaries.push(summary);
    }

    if args.json {
        let output_json = JsonOutput::stdout();
        match reports.as_slice() {
            [single] if !args.per_folder => output_json.write(single, true)?,
            all => output_json.write(all, true)?,
        }
        output_json.flush()?;
    }

    let exit_code = if summaries.iter().any(|s| s.write_failures > 0) {
        ExitCode::WriteFailures
    } else {
        ExitCode::Success
    };
    Ok(RunResult {
        summaries,
        exit_code,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(toml: &str) -> AppConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = RunArgs {
            workers: Some(2),
            flush_every: Some(5),
            ..RunArgs::default()
        };
        let cfg = config("[run]\nworkers = 8\nflush_every = 50\nimage_timeout_secs = 3.0");
        let args = RunArgs::with_config(args, &cfg);
        assert_eq!(args.workers, Some(2));
        assert_eq!(args.flush_every, Some(5));
        assert_eq!(args.timeout, Some(3.0));
    }

    #[test]
    fn test_config_sequential_yields_to_cli_workers() {
        let cfg = config("[run]\nsequential = true");
        let args = RunArgs::with_config(RunArgs::default(), &cfg);
        assert_eq!(args.mode(), ExecutionMode::Sequential);

        let args = RunArgs {
            workers: Some(3),
            ..RunArgs::default()
        };
        let args = RunArgs::with_config(args, &cfg);
        assert_eq!(args.mode(), ExecutionMode::Pool { workers: 3 });
    }

    #[test]
    fn test_defaults() {
        let args = RunArgs::with_config(RunArgs::default(), &AppConfig::default());
        let options = args.run_options().unwrap();
        assert_eq!(options.mode, ExecutionMode::Pool { workers: 4 });
        assert_eq!(options.flush_every, 10);
        assert!(options.image_timeout.is_none());
        assert_eq!(
            args.output_dir(Path::new("photos")),
            Path::new("photos").join("output")
        );
    }

    #[test]
    fn test_output_and_landmarks_from_config() {
        let cfg = config("[output]\ndir = 'sorted'\n[perception]\nlandmarks_dir = 'lm'");
        let args = RunArgs::with_config(RunArgs::default(), &cfg);
        assert_eq!(args.output_dir(Path::new("in")), PathBuf::from("sorted"));
        assert_eq!(args.landmarks_dir, Some(PathBuf::from("lm")));
    }

    #[test]
    fn test_timeout_option() {
        let args = RunArgs {
            timeout: Some(1.5),
            ..RunArgs::default()
        };
        let options = args.run_options().unwrap();
        assert_eq!(options.image_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parsers() {
        assert_eq!(parse_workers("3"), Ok(3));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("many").is_err());
        assert_eq!(parse_seconds("0.25"), Ok(0.25));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-2").is_err());
        assert!(parse_seconds("inf").is_err());
    }

    #[test]
    fn test_subfolders_sorted_without_output() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b", "a", "output"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("loose.png"), b"x").unwrap();

        let folders = subfolders(dir.path(), &dir.path().join("output")).unwrap();
        let names: Vec<_> = folders
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }
}
