//! Full head visibility: is the forehead or chin cut off by the frame?

use anyhow::anyhow;

use super::{CheckContext, FaceCheck};
use crate::domain::{labels::head_fully, CheckKind, CheckOutcome, DetectionOptions, FaceMesh};

/// Mesh index at the top of the forehead.
pub const TOP_OF_HEAD: usize = 10;
/// Mesh index at the bottom of the chin.
pub const CHIN: usize = 152;

/// Distance from the top or bottom edge, in pixels, under which a landmark
/// counts as cut.
const EDGE_MARGIN_PX: f64 = 10.0;

const MESH_OPTIONS: DetectionOptions = DetectionOptions {
    max_faces: 1,
    min_confidence: 0.5,
    refine_landmarks: false,
    range: crate::domain::DetectionRange::Short,
};

/// Passes when neither the forehead nor the chin touches the frame edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadFullyCheck;

impl HeadFullyCheck {
    /// Classifies a normalized mesh for an image of the given height.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh lacks the forehead or chin landmark.
    pub fn classify(mesh: &FaceMesh, height: u32) -> anyhow::Result<CheckOutcome> {
        let h = f64::from(height);
        let top = mesh
            .get(TOP_OF_HEAD)
            .ok_or_else(|| anyhow!("mesh has no landmark {TOP_OF_HEAD}"))?;
        let chin = mesh
            .get(CHIN)
            .ok_or_else(|| anyhow!("mesh has no landmark {CHIN}"))?;

        let top_cut = f64::from(top.y) * h < EDGE_MARGIN_PX;
        let chin_cut = f64::from(chin.y) * h > h - EDGE_MARGIN_PX;

        Ok(match (top_cut, chin_cut) {
            (true, true) => CheckOutcome::fail(head_fully::BOTH_CUT),
            (true, false) => CheckOutcome::fail(head_fully::TOP_CUT),
            (false, true) => CheckOutcome::fail(head_fully::CHIN_CUT),
            (false, false) => CheckOutcome::pass(head_fully::VISIBLE),
        })
    }
}

impl FaceCheck for HeadFullyCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::HeadFully
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome> {
        let mesh = match ctx.perception.face_mesh(ctx.image, &MESH_OPTIONS) {
            Ok(Some(mesh)) => mesh,
            Ok(None) => {
                return Ok(CheckOutcome::DetectionAbsent {
                    label: head_fully::NO_FACE,
                })
            }
            Err(e) => return Ok(CheckOutcome::fault("during head visibility check", &e)),
        };
        Ok(Self::classify(&mesh, ctx.image.height)
            .unwrap_or_else(|e| CheckOutcome::fault("during head visibility check", &e)))
    }
}
