//! Face geometry returned by the perception collaborator.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

/// A landmark in normalized image coordinates.
///
/// `x` and `y` are fractions of width and height. `z` is relative depth and
/// stays in model units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A landmark converted to integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelLandmark {
    pub x: i32,
    pub y: i32,
    pub z: f32,
}

/// Dense landmark mesh for a single face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMesh {
    /// Landmarks in normalized coordinates, indexed by mesh topology.
    pub landmarks: Vec<Landmark>,
    /// Detection confidence.
    pub score: f32,
}

impl FaceMesh {
    #[must_use]
    pub const fn new(landmarks: Vec<Landmark>, score: f32) -> Self {
        Self { landmarks, score }
    }

    /// Returns a landmark by mesh index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Converts every landmark to pixel space by truncation.
    #[must_use]
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<PixelLandmark> {
        let (w, h) = (width as f32, height as f32);
        self.landmarks
            .iter()
            .map(|lm| PixelLandmark {
                x: (lm.x * w) as i32,
                y: (lm.y * h) as i32,
                z: lm.z,
            })
            .collect()
    }

    /// Smallest normalized box containing every landmark.
    #[must_use]
    pub fn extent(&self) -> Option<RelativeBox> {
        let first = self.landmarks.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for lm in &self.landmarks[1..] {
            min_x = min_x.min(lm.x);
            min_y = min_y.min(lm.y);
            max_x = max_x.max(lm.x);
            max_y = max_y.max(lm.y);
        }
        Some(RelativeBox {
            xmin: min_x,
            ymin: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

/// Face box in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeBox {
    pub xmin: f32,
    pub ymin: f32,
    pub width: f32,
    pub height: f32,
}

impl RelativeBox {
    /// Converts to pixels by truncation. The result may extend past the image.
    #[must_use]
    pub fn to_pixels(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (width as f32, height as f32);
        BoundingBox {
            x: (self.xmin * w) as i32,
            y: (self.ymin * h) as i32,
            width: (self.width * w) as i32,
            height: (self.height * h) as i32,
        }
    }
}

/// A single face detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub score: f32,
    pub bbox: RelativeBox,
}

/// Face box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Detector range profile.
///
/// A full-range call sees every face; a short-range call misses faces that
/// only a full-range detector reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionRange {
    /// Faces within roughly two meters.
    #[default]
    Short,
    /// Faces up to roughly five meters.
    Full,
}

impl DetectionRange {
    /// Whether a detector with this profile reaches a face found at `face`.
    #[must_use]
    pub const fn reaches(self, face: Self) -> bool {
        matches!((self, face), (Self::Full, _) | (Self::Short, Self::Short))
    }
}

/// Per-call perception options.
///
/// Each check keeps its own options rather than sharing one detector setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionOptions {
    pub max_faces: usize,
    pub min_confidence: f32,
    pub refine_landmarks: bool,
    pub range: DetectionRange,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            max_faces: 1,
            min_confidence: 0.5,
            refine_landmarks: false,
            range: DetectionRange::Short,
        }
    }
}
