//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod image_source;
mod perception;
mod progress;
mod report_sink;
mod router;

pub use image_source::ImageSource;
pub use perception::FacePerception;
pub use progress::{ProgressEvent, ProgressSink};
pub use report_sink::ReportSink;
pub use router::OutcomeRouter;
