//! The six face checks and the landmark stage they share.
//!
//! Each check turns one decoded image (plus the landmark stage result) into a
//! tagged [`CheckOutcome`]. Checks are stateless and only read the image.

mod blur;
mod eyes;
mod face_size;
mod head_fully;
mod head_pose;
mod landmarks;
mod lighting;
mod pnp;

pub use blur::{laplacian_variance, BlurCheck, BlurConfig};
pub use eyes::{eye_aspect_ratio, EyeStatusCheck, LEFT_EYE, RIGHT_EYE};
pub use face_size::FaceSizeCheck;
pub use head_fully::{HeadFullyCheck, CHIN, TOP_OF_HEAD};
pub use head_pose::{
    classify_pose, estimate_pose, HeadPose, HeadPoseCheck, PoseLimits, POSE_LANDMARKS,
};
pub use landmarks::{
    extract_landmarks, landmark_box, LandmarkResult, LandmarkStatus, LANDMARK_OPTIONS,
};
pub use lighting::{
    classify_lighting, measure_brightness, BrightnessSample, LightingCheck, LightingConfig,
    LIGHTING_DETECTION,
};
pub use pnp::{
    euler_to_rotation, model_points, rotation_to_euler, solve_pnp, CameraModel, PnpSolution,
    FACE_MODEL,
};

use crate::domain::{CheckKind, CheckOutcome, ImageInfo, Thresholds, CANNOT_READ};
use crate::ports::FacePerception;

/// Everything a check may look at for one image.
pub struct CheckContext<'a> {
    pub image: &'a ImageInfo,
    pub landmarks: &'a LandmarkResult,
    pub perception: &'a dyn FacePerception,
}

/// A single quality check.
pub trait FaceCheck: Send + Sync {
    /// Which check this is; selects output folder and timing column.
    fn kind(&self) -> CheckKind;

    /// Evaluates the check.
    ///
    /// Expected conditions (no face, degenerate crop, perception failure) are
    /// outcomes. An `Err` is an escaped fault and degrades the rest of the image.
    ///
    /// # Errors
    ///
    /// Returns an error only for faults the check could not classify.
    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome>;
}

/// Options that change what a check measures rather than its thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Restrict the blur measurement to the detected face.
    pub blur_face_region: bool,
}

/// Builds the six checks in execution order.
#[must_use]
pub fn default_checks(thresholds: &Thresholds, options: CheckOptions) -> Vec<Box<dyn FaceCheck>> {
    vec![
        Box::new(FaceSizeCheck::new(thresholds.face_size)),
        Box::new(EyeStatusCheck::new(thresholds.ear_threshold)),
        Box::new(LightingCheck::new(LightingConfig::from(thresholds))),
        Box::new(BlurCheck::new(BlurConfig {
            threshold: thresholds.blur,
            face_region: options.blur_face_region,
        })),
        Box::new(HeadFullyCheck),
        Box::new(HeadPoseCheck::new(PoseLimits::from(thresholds))),
    ]
}

/// Outcome for checks that consume the landmark stage when it did not detect
/// a face.
fn upstream_outcome(landmarks: &LandmarkResult, no_face_label: &'static str) -> CheckOutcome {
    match &landmarks.status {
        LandmarkStatus::Detected | LandmarkStatus::NoFace => CheckOutcome::DetectionAbsent {
            label: no_face_label,
        },
        LandmarkStatus::Unreadable => CheckOutcome::Unusable { label: CANNOT_READ },
        LandmarkStatus::Failed(reason) => CheckOutcome::Fault {
            description: format!("Error during face detection: {reason}"),
        },
    }
}
