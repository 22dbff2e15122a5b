//! Face size check on the landmark-derived face box.

use super::{upstream_outcome, CheckContext, FaceCheck};
use crate::domain::{labels::face_size, BoundingBox, CheckKind, CheckOutcome};

/// Passes when both sides of the face box exceed a minimum in pixels.
pub struct FaceSizeCheck {
    min_size: f64,
}

impl FaceSizeCheck {
    #[must_use]
    pub const fn new(min_size: f64) -> Self {
        Self { min_size }
    }

    /// Classifies a face box. `None` means no box was produced.
    #[must_use]
    pub fn classify(&self, bbox: Option<&BoundingBox>) -> CheckOutcome {
        let Some(bbox) = bbox else {
            return CheckOutcome::DetectionAbsent {
                label: face_size::NO_BOX,
            };
        };
        if f64::from(bbox.width) > self.min_size && f64::from(bbox.height) > self.min_size {
            CheckOutcome::pass(face_size::PASS)
        } else {
            CheckOutcome::fail(face_size::FAIL)
        }
    }
}

impl FaceCheck for FaceSizeCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::FaceSize
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome> {
        match ctx.landmarks.bbox.as_ref() {
            Some(bbox) => Ok(self.classify(Some(bbox))),
            None => Ok(upstream_outcome(ctx.landmarks, face_size::NO_BOX)),
        }
    }
}
