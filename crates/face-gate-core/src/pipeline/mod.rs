//! Batch pipeline: per-image worker, accumulator and scheduler.

mod accumulator;
mod runner;
mod worker;

pub use accumulator::Accumulator;
pub use runner::{BatchRunner, ExecutionMode, RunOptions, RunSummary};
pub use worker::{ImageReport, ImageWorker};
