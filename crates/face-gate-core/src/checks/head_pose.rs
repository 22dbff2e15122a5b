//! Head pose check: is the subject facing the camera?
//!
//! Only the image-plane position of each pose landmark is used; depth comes
//! from the canonical face model, so a mesh's `z` values do not affect the pose.

#![allow(clippy::cast_possible_truncation)]

use std::f64::consts::TAU;

use anyhow::anyhow;
use nalgebra::Vector2;
use tracing::debug;

use super::pnp::{model_points, rotation_to_euler, solve_pnp, CameraModel, FACE_MODEL};
use super::{CheckContext, FaceCheck};
use crate::domain::{
    labels::head_pose, CheckKind, CheckOutcome, DetectionOptions, DetectionRange, FaceMesh,
    Thresholds,
};

/// Mesh indices used for pose: eye corners, nose tip, mouth corners, chin.
pub const POSE_LANDMARKS: [usize; 6] = [33, 263, 1, 61, 291, 199];

const MESH_OPTIONS: DetectionOptions = DetectionOptions {
    max_faces: 1,
    min_confidence: 0.5,
    refine_landmarks: true,
    range: DetectionRange::Short,
};

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Angle limits in degrees, checked in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct PoseLimits {
    pub left: f64,
    pub right: f64,
    pub down: f64,
    pub up: f64,
    pub tilt_left: f64,
    pub tilt_right: f64,
}

impl From<&Thresholds> for PoseLimits {
    fn from(t: &Thresholds) -> Self {
        Self {
            left: t.left_th,
            right: t.right_th,
            down: t.down_th,
            up: t.up_th,
            tilt_left: t.til_left_th,
            tilt_right: t.til_right_th,
        }
    }
}

/// Classifies a pose. The first violated limit wins.
#[must_use]
pub fn classify_pose(pose: &HeadPose, limits: &PoseLimits) -> CheckOutcome {
    let label = if pose.yaw < limits.left {
        head_pose::LEFT
    } else if pose.yaw > limits.right {
        head_pose::RIGHT
    } else if pose.pitch < limits.down {
        head_pose::DOWN
    } else if pose.pitch > limits.up {
        head_pose::UP
    } else if pose.roll < limits.tilt_left {
        head_pose::TILT_LEFT
    } else if pose.roll > limits.tilt_right {
        head_pose::TILT_RIGHT
    } else {
        return CheckOutcome::pass(head_pose::FORWARD);
    };
    CheckOutcome::fail(label)
}

/// Converts radians to turns scaled by 360.
fn scaled_turns(radians: f64) -> f64 {
    radians / TAU * 360.0
}

/// Estimates the head pose from a normalized mesh.
///
/// Returns `Ok(None)` when the solver does not converge.
///
/// # Errors
///
/// Returns an error if the mesh lacks a pose landmark.
pub fn estimate_pose(mesh: &FaceMesh, width: u32, height: u32) -> anyhow::Result<Option<HeadPose>> {
    let (w, h) = (f64::from(width), f64::from(height));
    let mut image_points = Vec::with_capacity(FACE_MODEL.len());
    for (index, _) in FACE_MODEL {
        let lm = mesh
            .get(index)
            .ok_or_else(|| anyhow!("mesh has no landmark {index}"))?;
        // pixel positions are truncated like every other landmark consumer
        image_points.push(Vector2::new(
            (f64::from(lm.x) * w).trunc(),
            (f64::from(lm.y) * h).trunc(),
        ));
    }

    let camera = CameraModel::for_image(width, height);
    let Some(solution) = solve_pnp(&model_points(), &image_points, &camera) else {
        return Ok(None);
    };
    let (pitch, yaw, roll) = rotation_to_euler(solution.rotation.matrix());
    debug!("PnP rms error {:.3}px", solution.rms_error);

    Ok(Some(HeadPose {
        pitch: scaled_turns(pitch),
        yaw: scaled_turns(yaw),
        roll: scaled_turns(roll),
    }))
}

/// Passes when yaw, pitch and roll all fall inside their limits.
pub struct HeadPoseCheck {
    limits: PoseLimits,
}

impl HeadPoseCheck {
    #[must_use]
    pub const fn new(limits: PoseLimits) -> Self {
        Self { limits }
    }
}

impl FaceCheck for HeadPoseCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::HeadPose
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome> {
        let mesh = match ctx.perception.face_mesh(ctx.image, &MESH_OPTIONS) {
            Ok(Some(mesh)) => mesh,
            Ok(None) => {
                return Ok(CheckOutcome::DetectionAbsent {
                    label: head_pose::NO_FACE,
                })
            }
            Err(e) => return Ok(CheckOutcome::fault("during head pose check", &e)),
        };

        match estimate_pose(&mesh, ctx.image.width, ctx.image.height) {
            Ok(Some(pose)) => {
                debug!(
                    "Pose pitch={:.1} yaw={:.1} roll={:.1}",
                    pose.pitch, pose.yaw, pose.roll
                );
                Ok(classify_pose(&pose, &self.limits))
            }
            Ok(None) => Ok(CheckOutcome::Unusable {
                label: head_pose::SOLVE_FAILED,
            }),
            Err(e) => Ok(CheckOutcome::fault("during head pose check", &e)),
        }
    }
}
