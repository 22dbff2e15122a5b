//! Perception backend that reads precomputed landmark sidecar files.
//!
//! For `photo.jpg` the sidecar is `photo.jpg.faces.json`, next to the image
//! or in a dedicated landmarks directory:
//!
//! ```json
//! { "faces": [ { "score": 0.97,
//!                "bbox": { "xmin": 0.31, "ymin": 0.18, "width": 0.38, "height": 0.52 },
//!                "landmarks": [[0.49, 0.55, -0.03], ...] } ] }
//! ```
//!
//! Coordinates are normalized to the image size. A missing sidecar means no
//! face was found. A face tagged `"range": "full"` is only visible to
//! full-range detection calls.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use face_gate_core::domain::{
    DetectionOptions, DetectionRange, FaceDetection, FaceMesh, ImageInfo, Landmark, RelativeBox,
};
use face_gate_core::FacePerception;
use serde::Deserialize;
use tracing::debug;

/// Suffix appended to the image file name to locate its sidecar.
pub const SIDECAR_SUFFIX: &str = ".faces.json";

/// Landmarks in an unrefined mesh; refinement adds the iris points.
const UNREFINED_POINTS: usize = 468;

#[derive(Debug, Deserialize)]
struct SidecarFile {
    #[serde(default)]
    faces: Vec<SidecarFace>,
}

#[derive(Debug, Deserialize)]
struct SidecarFace {
    #[serde(default = "full_confidence")]
    score: f32,
    #[serde(default)]
    bbox: Option<RelativeBox>,
    #[serde(default)]
    landmarks: Vec<[f32; 3]>,
    #[serde(default)]
    range: DetectionRange,
}

const fn full_confidence() -> f32 {
    1.0
}

impl SidecarFace {
    fn mesh(&self, refine: bool) -> Option<FaceMesh> {
        if self.landmarks.is_empty() {
            return None;
        }
        let limit = if refine {
            self.landmarks.len()
        } else {
            self.landmarks.len().min(UNREFINED_POINTS)
        };
        let landmarks = self.landmarks[..limit]
            .iter()
            .map(|&[x, y, z]| Landmark::new(x, y, z))
            .collect();
        Some(FaceMesh::new(landmarks, self.score))
    }

    fn detection(&self) -> Option<FaceDetection> {
        let bbox = self
            .bbox
            .or_else(|| self.mesh(true).and_then(|mesh| mesh.extent()))?;
        Some(FaceDetection {
            score: self.score,
            bbox,
        })
    }
}

/// `FacePerception` backed by sidecar JSON files.
#[derive(Debug, Clone, Default)]
pub struct SidecarPerception {
    landmarks_dir: Option<PathBuf>,
}

impl SidecarPerception {
    /// Looks for sidecars next to each image.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            landmarks_dir: None,
        }
    }

    /// Looks for sidecars in one directory, by image file name.
    #[must_use]
    pub fn with_landmarks_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            landmarks_dir: Some(dir.into()),
        }
    }

    /// Sidecar location for an image.
    #[must_use]
    pub fn sidecar_path(&self, image: &ImageInfo) -> PathBuf {
        let name = format!("{}{SIDECAR_SUFFIX}", image.file_name());
        match &self.landmarks_dir {
            Some(dir) => dir.join(name),
            None => Path::new(&image.path)
                .parent()
                .map_or_else(|| PathBuf::from(&name), |parent| parent.join(&name)),
        }
    }

    /// Faces considered for one call: those in range and above
    /// `min_confidence`, capped at `max_faces`.
    fn faces(&self, image: &ImageInfo, options: &DetectionOptions) -> Result<Vec<SidecarFace>> {
        let path = self.sidecar_path(image);
        if !path.is_file() {
            debug!("No sidecar at {}", path.display());
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sidecar: {}", path.display()))?;
        let file: SidecarFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sidecar: {}", path.display()))?;

        Ok(file
            .faces
            .into_iter()
            .filter(|face| options.range.reaches(face.range))
            .filter(|face| face.score >= options.min_confidence)
            .take(options.max_faces)
            .collect())
    }
}

impl FacePerception for SidecarPerception {
    fn face_mesh(
        &self,
        image: &ImageInfo,
        options: &DetectionOptions,
    ) -> Result<Option<FaceMesh>> {
        Ok(self
            .faces(image, options)?
            .iter()
            .find_map(|face| face.mesh(options.refine_landmarks)))
    }

    fn detect_face(
        &self,
        image: &ImageInfo,
        options: &DetectionOptions,
    ) -> Result<Option<FaceDetection>> {
        Ok(self
            .faces(image, options)?
            .iter()
            .find_map(SidecarFace::detection))
    }
}
