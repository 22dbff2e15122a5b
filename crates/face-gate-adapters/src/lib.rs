//! face-gate adapters - filesystem and perception adapters for face-gate.
//!
//! This crate provides adapters for:
//! - Walking an input tree for images
//! - Reading landmark sidecar files as the perception backend
//! - Copying images into outcome folders
//! - Writing the JSON report

pub mod fs;
pub mod perception;
pub mod report;
pub mod router;

pub use fs::FsImageSource;
pub use perception::{SidecarPerception, SIDECAR_SUFFIX};
pub use report::{JsonReportWriter, REPORT_FILE};
pub use router::FsOutcomeRouter;
