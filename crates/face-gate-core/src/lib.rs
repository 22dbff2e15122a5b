//! face-gate core - domain types, face checks and the batch pipeline
//!
//! This crate holds the check outcome model and label table, the six face
//! checks with the landmark stage they share, the per-image worker, and the
//! scheduler that accumulates results and timings across a batch.

pub mod checks;
pub mod domain;
pub mod pipeline;
pub mod ports;

pub use domain::{
    CheckKind, CheckOutcome, ImageInfo, ImageRecord, ReportTables, ResultRow, RunningTotals,
    Stage, Thresholds, TimingRecord,
};
pub use pipeline::{BatchRunner, ExecutionMode, ImageWorker, RunOptions, RunSummary};
pub use ports::{
    FacePerception, ImageSource, OutcomeRouter, ProgressEvent, ProgressSink, ReportSink,
};
