//! Batch scheduling: sequential or bounded pool, one accumulator lock.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::accumulator::Accumulator;
use super::worker::{ImageReport, ImageWorker};
use crate::domain::{CheckOutcome, ImageRecord, RunningTotals};
use crate::ports::{ImageSource, OutcomeRouter, ProgressEvent, ProgressSink, ReportSink};

/// How images are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One image after another on the calling thread.
    Sequential,
    /// A bounded pool of worker threads.
    Pool { workers: usize },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Pool { workers: 4 }
    }
}

/// Runner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: ExecutionMode,
    /// Write the report after this many completed images. 0 writes only at the end.
    pub flush_every: usize,
    /// Abandon an image that takes longer than this.
    pub image_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            flush_every: 10,
            image_timeout: None,
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Images found in the source.
    pub images: usize,
    /// Rows in the final report.
    pub rows: usize,
    /// Images whose worker panicked.
    pub faulted: usize,
    /// Images abandoned at the deadline.
    pub timed_out: usize,
    /// Copies, folder preparation or report writes that failed.
    pub write_failures: usize,
    pub totals: RunningTotals,
}

/// How one image left the worker.
enum Disposition {
    Completed,
    Panicked(String),
    TimedOut,
}

#[derive(Default)]
struct RunState {
    accumulator: Accumulator,
    faulted: usize,
    timed_out: usize,
}

/// Drives every image of a source through the worker.
pub struct BatchRunner {
    worker: Arc<ImageWorker>,
    options: RunOptions,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn run_guarded(worker: &ImageWorker, record: &ImageRecord) -> (ImageReport, Disposition) {
    match catch_unwind(AssertUnwindSafe(|| worker.process(record))) {
        Ok(report) => (report, Disposition::Completed),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let report = ImageReport::uniform(record, |_| CheckOutcome::Fault {
                description: format!("Error processing image: worker panicked: {message}"),
            });
            (report, Disposition::Panicked(message))
        }
    }
}

impl BatchRunner {
    #[must_use]
    pub const fn new(worker: Arc<ImageWorker>, options: RunOptions) -> Self {
        Self { worker, options }
    }

    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs the batch.
    ///
    /// Per-image faults and write failures never abort the run; they are
    /// counted in the summary. An empty source touches neither the router nor
    /// the report sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated or the worker pool
    /// cannot be built.
    pub fn run(
        &self,
        source: &dyn ImageSource,
        router: &dyn OutcomeRouter,
        sink: &dyn ReportSink,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary> {
        let records = source.records().context("Failed to enumerate input images")?;
        let total = records.len();
        if total == 0 {
            info!("No images found");
            progress.on_event(ProgressEvent::Finished {
                processed: 0,
                write_failures: 0,
            });
            return Ok(RunSummary::default());
        }
        info!("Processing {total} images with {:?}", self.options.mode);

        let write_failures = AtomicUsize::new(0);
        if let Err(e) = router.prepare() {
            error!("Failed to prepare output folders: {e:#}");
            write_failures.fetch_add(1, Ordering::Relaxed);
        }

        let state = Mutex::new(RunState::default());
        let process = |index: usize, record: &ImageRecord| {
            self.process_one(
                index,
                total,
                record,
                router,
                sink,
                progress,
                &state,
                &write_failures,
            );
        };

        match self.options.mode {
            ExecutionMode::Sequential => {
                for (index, record) in records.iter().enumerate() {
                    process(index, record);
                }
            }
            ExecutionMode::Pool { workers } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers.max(1))
                    .thread_name(|i| format!("face-gate-worker-{i}"))
                    .build()
                    .context("Failed to build worker pool")?;
                pool.install(|| {
                    records
                        .par_iter()
                        .enumerate()
                        .for_each(|(index, record)| process(index, record));
                });
            }
        }

        let state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let tables = state.accumulator.tables();
        match sink.write(&tables) {
            Ok(()) => progress.on_event(ProgressEvent::Flushed {
                rows: tables.results.len(),
            }),
            Err(e) => {
                error!("Failed to write final report: {e:#}");
                write_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        let summary = RunSummary {
            images: total,
            rows: state.accumulator.len(),
            faulted: state.faulted,
            timed_out: state.timed_out,
            write_failures: write_failures.into_inner(),
            totals: state.accumulator.totals().clone(),
        };
        progress.on_event(ProgressEvent::Finished {
            processed: summary.rows,
            write_failures: summary.write_failures,
        });
        info!(
            "Processed {} images ({} faulted, {} timed out, {} write failures)",
            summary.rows, summary.faulted, summary.timed_out, summary.write_failures
        );
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_one(
        &self,
        index: usize,
        total: usize,
        record: &ImageRecord,
        router: &dyn OutcomeRouter,
        sink: &dyn ReportSink,
        progress: &dyn ProgressSink,
        state: &Mutex<RunState>,
        write_failures: &AtomicUsize,
    ) {
        progress.on_event(ProgressEvent::Started {
            path: record.path.display().to_string(),
            index,
            total,
        });

        let (report, disposition) = self.execute(record);

        for (check, outcome) in &report.outcomes {
            if let Err(e) = router.route(&report.record, *check, outcome) {
                warn!("Failed to route {} for {check}: {e:#}", record.path.display());
                write_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.accumulator.record(&report);
            match disposition {
                Disposition::Completed => {}
                Disposition::Panicked(_) => state.faulted += 1,
                Disposition::TimedOut => state.timed_out += 1,
            }
            if state.accumulator.flush_due(self.options.flush_every) {
                let tables = state.accumulator.tables();
                match sink.write(&tables) {
                    Ok(()) => {
                        debug!("Flushed {} rows", tables.results.len());
                        progress.on_event(ProgressEvent::Flushed {
                            rows: tables.results.len(),
                        });
                    }
                    Err(e) => {
                        error!("Failed to flush report: {e:#}");
                        write_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        let path = record.path.display().to_string();
        match disposition {
            Disposition::Completed => progress.on_event(ProgressEvent::Completed {
                image_name: report.row.image_name.clone(),
                failed_checks: report.failed_checks(),
            }),
            Disposition::Panicked(message) => {
                error!("Worker panicked on {path}: {message}");
                progress.on_event(ProgressEvent::Faulted {
                    path,
                    reason: format!("worker panicked: {message}"),
                });
            }
            Disposition::TimedOut => {
                warn!("Abandoned {path} after the deadline");
                progress.on_event(ProgressEvent::Faulted {
                    path,
                    reason: "timed out".to_string(),
                });
            }
        }
    }

    /// Runs the worker, enforcing the optional deadline.
    fn execute(&self, record: &ImageRecord) -> (ImageReport, Disposition) {
        let Some(deadline) = self.options.image_timeout else {
            return run_guarded(&self.worker, record);
        };

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&self.worker);
        let owned = record.clone();
        let spawned = thread::Builder::new()
            .name("face-gate-deadline".to_string())
            .spawn(move || {
                // receiver may be gone after a timeout
                let _ = tx.send(run_guarded(&worker, &owned));
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn deadline thread, running inline: {e}");
            return run_guarded(&self.worker, record);
        }

        match rx.recv_timeout(deadline) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let report = ImageReport::uniform(record, |kind| CheckOutcome::DetectionAbsent {
                    label: kind.no_face_label(),
                });
                (report, Disposition::TimedOut)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let message = "worker thread exited without a result".to_string();
                let report = ImageReport::uniform(record, |_| CheckOutcome::Fault {
                    description: format!("Error processing image: {message}"),
                });
                (report, Disposition::Panicked(message))
            }
        }
    }
}
