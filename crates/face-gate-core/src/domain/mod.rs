//! Core domain types for face quality gating.

mod face;
mod outcome;
mod record;
mod report;
mod thresholds;

pub use face::{
    BoundingBox, DetectionOptions, DetectionRange, FaceDetection, FaceMesh, Landmark,
    PixelLandmark, RelativeBox,
};
pub use outcome::{labels, CheckKind, CheckOutcome, Stage, CANNOT_READ, ERROR_FOLDER};
pub use record::{ImageInfo, ImageRecord};
pub use report::{ReportTables, ResultRow, RunningTotals, SummaryRow, TimingRecord};
pub use thresholds::Thresholds;
