//! Eye openness check using the eye aspect ratio (EAR).
//!
//! EAR = (|p2 - p6| + |p3 - p5|) / (2 |p1 - p4|) over six contour points per
//! eye. Open eyes sit well above 0.2; closed eyes collapse towards zero.

use nalgebra::Vector2;
use tracing::debug;

use super::{upstream_outcome, CheckContext, FaceCheck};
use crate::domain::{labels::eye_status, CheckKind, CheckOutcome, PixelLandmark};

/// Mesh indices of the left eye contour: p1..p6.
pub const LEFT_EYE: [usize; 6] = [33, 160, 159, 133, 158, 157];
/// Mesh indices of the right eye contour: p1..p6.
pub const RIGHT_EYE: [usize; 6] = [362, 387, 386, 263, 385, 384];

/// Eye aspect ratio for one eye.
///
/// A missing landmark, a zero horizontal span or a non-finite result all
/// yield 0.0 (treated as closed).
#[must_use]
pub fn eye_aspect_ratio(landmarks: &[PixelLandmark], indices: &[usize; 6]) -> f64 {
    let mut points = [Vector2::zeros(); 6];
    for (point, &index) in points.iter_mut().zip(indices) {
        let Some(lm) = landmarks.get(index) else {
            return 0.0;
        };
        *point = Vector2::new(f64::from(lm.x), f64::from(lm.y));
    }
    let [p1, p2, p3, p4, p5, p6] = points;

    let horizontal = (p1 - p4).norm();
    if horizontal < f64::EPSILON {
        return 0.0;
    }
    let vertical = (p2 - p6).norm() + (p3 - p5).norm();
    let ear = vertical / (2.0 * horizontal);
    if ear.is_finite() {
        ear
    } else {
        0.0
    }
}

/// Passes when both eyes are open.
pub struct EyeStatusCheck {
    ear_threshold: f64,
}

impl EyeStatusCheck {
    #[must_use]
    pub const fn new(ear_threshold: f64) -> Self {
        Self { ear_threshold }
    }

    /// Classifies a pixel-space mesh.
    #[must_use]
    pub fn classify(&self, landmarks: &[PixelLandmark]) -> CheckOutcome {
        let left = eye_aspect_ratio(landmarks, &LEFT_EYE);
        let right = eye_aspect_ratio(landmarks, &RIGHT_EYE);
        debug!("EAR left={left:.3} right={right:.3}");

        if left > self.ear_threshold && right > self.ear_threshold {
            CheckOutcome::pass(eye_status::OPEN)
        } else {
            CheckOutcome::fail(eye_status::CLOSED)
        }
    }
}

impl FaceCheck for EyeStatusCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::EyeStatus
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome> {
        match ctx.landmarks.landmarks.as_deref() {
            Some(landmarks) => Ok(self.classify(landmarks)),
            None => Ok(upstream_outcome(ctx.landmarks, eye_status::NO_FACE)),
        }
    }
}
