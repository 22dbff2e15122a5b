//! Landmark stage: dense mesh for the first face plus a derived face box.
//!
//! The stage is timed but never routed. Its result feeds the face size and
//! eye status checks.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use tracing::debug;

use crate::domain::{
    labels, BoundingBox, DetectionOptions, DetectionRange, ImageInfo, PixelLandmark, CANNOT_READ,
};
use crate::ports::FacePerception;

/// Mesh options for the landmark stage.
pub const LANDMARK_OPTIONS: DetectionOptions = DetectionOptions {
    max_faces: 10,
    min_confidence: 0.5,
    refine_landmarks: true,
    range: DetectionRange::Short,
};

/// Fraction of the landmark extent added on each side of the face box.
const BOX_MARGIN: f32 = 0.1;

/// How the landmark stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandmarkStatus {
    Detected,
    NoFace,
    Unreadable,
    /// Perception failed; carries the error description.
    Failed(String),
}

/// Landmark stage output.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkResult {
    pub status: LandmarkStatus,
    /// Pixel-space landmarks of the first face.
    pub landmarks: Option<Vec<PixelLandmark>>,
    /// Face box derived from the landmark extents.
    pub bbox: Option<BoundingBox>,
}

impl LandmarkResult {
    #[must_use]
    pub const fn no_face() -> Self {
        Self {
            status: LandmarkStatus::NoFace,
            landmarks: None,
            bbox: None,
        }
    }

    #[must_use]
    pub const fn unreadable() -> Self {
        Self {
            status: LandmarkStatus::Unreadable,
            landmarks: None,
            bbox: None,
        }
    }

    /// Stage message, mirroring the results-table wording.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.status {
            LandmarkStatus::Detected => labels::landmarks::DETECTED.to_string(),
            LandmarkStatus::NoFace => labels::landmarks::NO_FACE.to_string(),
            LandmarkStatus::Unreadable => CANNOT_READ.to_string(),
            LandmarkStatus::Failed(reason) => format!("Error during face detection: {reason}"),
        }
    }
}

/// Runs the landmark stage for one decoded image.
pub fn extract_landmarks(image: &ImageInfo, perception: &dyn FacePerception) -> LandmarkResult {
    let mesh = match perception.face_mesh(image, &LANDMARK_OPTIONS) {
        Ok(Some(mesh)) => mesh,
        Ok(None) => {
            debug!("No landmarks for {}", image.path);
            return LandmarkResult::no_face();
        }
        Err(e) => {
            debug!("Landmark extraction failed for {}: {e:#}", image.path);
            return LandmarkResult {
                status: LandmarkStatus::Failed(format!("{e:#}")),
                landmarks: None,
                bbox: None,
            };
        }
    };

    let landmarks = mesh.to_pixels(image.width, image.height);
    let Some(bbox) = landmark_box(&landmarks, image.width, image.height) else {
        return LandmarkResult::no_face();
    };

    LandmarkResult {
        status: LandmarkStatus::Detected,
        landmarks: Some(landmarks),
        bbox: Some(bbox),
    }
}

/// Box around the landmark extents, widened by 10% per side and clamped to
/// the image.
#[must_use]
pub fn landmark_box(landmarks: &[PixelLandmark], width: u32, height: u32) -> Option<BoundingBox> {
    let first = landmarks.first()?;
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
    for lm in &landmarks[1..] {
        x_min = x_min.min(lm.x);
        y_min = y_min.min(lm.y);
        x_max = x_max.max(lm.x);
        y_max = y_max.max(lm.y);
    }

    let margin_x = ((x_max - x_min) as f32 * BOX_MARGIN) as i32;
    let margin_y = ((y_max - y_min) as f32 * BOX_MARGIN) as i32;
    let width = i32::try_from(width).unwrap_or(i32::MAX);
    let height = i32::try_from(height).unwrap_or(i32::MAX);

    let left = (x_min - margin_x).max(0);
    let top = (y_min - margin_y).max(0);
    let right = (x_max + margin_x).min(width);
    let bottom = (y_max + margin_y).min(height);

    Some(BoundingBox::new(left, top, right - left, bottom - top))
}
