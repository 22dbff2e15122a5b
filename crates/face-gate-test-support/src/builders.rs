//! Synthetic image and face mesh builders for testing.

#![allow(clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

use face_gate_core::checks::{euler_to_rotation, CameraModel, FACE_MODEL, LEFT_EYE, RIGHT_EYE};
use face_gate_core::checks::{CHIN, TOP_OF_HEAD};
use face_gate_core::domain::{BoundingBox, FaceMesh, ImageInfo, ImageRecord, Landmark};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use nalgebra::{Vector2, Vector3};

/// Landmark count of a refined face mesh.
pub const MESH_POINTS: usize = 478;

/// Builder for creating synthetic test images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates a high-contrast checkerboard pattern (very sharp edges).
    #[must_use]
    pub fn checkerboard(width: u32, height: u32) -> ImageInfo {
        Self::checkerboard_with_cell_size(width, height, 8)
    }

    /// Creates a checkerboard with custom cell size.
    #[must_use]
    pub fn checkerboard_with_cell_size(width: u32, height: u32, cell_size: u32) -> ImageInfo {
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (x / cell_size + y / cell_size) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        ImageInfo::new("synthetic://checkerboard", DynamicImage::ImageLuma8(img))
    }

    /// Creates a uniform gray image (no edges, maximally blurry).
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> ImageInfo {
        let img = GrayImage::from_pixel(width, height, Luma([value]));
        ImageInfo::new("synthetic://uniform_gray", DynamicImage::ImageLuma8(img))
    }

    /// Creates an RGB color image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> ImageInfo {
        let img = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
        ImageInfo::new("synthetic://rgb_uniform", DynamicImage::ImageRgb8(img))
    }

    /// Creates a gray "portrait": a face rectangle of one brightness on a
    /// background of another.
    #[must_use]
    pub fn portrait(
        width: u32,
        height: u32,
        face: &BoundingBox,
        face_value: u8,
        background_value: u8,
    ) -> ImageInfo {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let inside = i64::from(x) >= i64::from(face.x)
                && i64::from(x) < i64::from(face.right())
                && i64::from(y) >= i64::from(face.y)
                && i64::from(y) < i64::from(face.bottom());
            let v = if inside { face_value } else { background_value };
            Rgb([v, v, v])
        });
        ImageInfo::new("synthetic://portrait", DynamicImage::ImageRgb8(img))
    }

    /// Creates a flat gray face rectangle on a sharp checkerboard background.
    ///
    /// The whole frame reads as sharp while the face alone is blurry.
    #[must_use]
    pub fn flat_face_on_texture(width: u32, height: u32, face: &BoundingBox) -> ImageInfo {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let inside = match (i32::try_from(x), i32::try_from(y)) {
                (Ok(x), Ok(y)) => face.contains(x, y),
                _ => false,
            };
            let v = if inside {
                128
            } else if (x / 8 + y / 8) % 2 == 0 {
                255
            } else {
                0
            };
            Rgb([v, v, v])
        });
        ImageInfo::new("synthetic://flat_face", DynamicImage::ImageRgb8(img))
    }

    /// Writes an image as `dir/name` (format from the extension) and returns
    /// its record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be encoded or written.
    pub fn write(dir: &Path, name: &str, image: &ImageInfo) -> anyhow::Result<ImageRecord> {
        let path = dir.join(name);
        image.image.to_rgb8().save(&path)?;
        Ok(ImageRecord::new(path))
    }
}

/// Builds a dense face mesh for a chosen head pose and eye openness.
///
/// Pose landmarks are projected from the same canonical face model and camera
/// the head pose check solves against, so the check recovers the requested
/// angles. Eye contours are drawn so each eye's aspect ratio equals the
/// requested openness.
#[derive(Debug, Clone)]
pub struct FaceMeshBuilder {
    width: u32,
    height: u32,
    pitch: f64,
    yaw: f64,
    roll: f64,
    distance: f64,
    left_eye: f64,
    right_eye: f64,
    forehead_y: Option<f32>,
    chin_y: Option<f32>,
    score: f32,
}

/// Forehead and chin in model space, outside the pose points.
const FOREHEAD_MODEL: [f64; 3] = [0.0, -420.0, 110.0];
const CHIN_MODEL: [f64; 3] = [0.0, 440.0, 90.0];

impl FaceMeshBuilder {
    /// Frontal face, eyes open, filling roughly the middle of the frame.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            distance: 2000.0,
            left_eye: 0.3,
            right_eye: 0.3,
            forehead_y: None,
            chin_y: None,
            score: 0.95,
        }
    }

    /// Pitch in degrees.
    #[must_use]
    pub const fn pitch(mut self, degrees: f64) -> Self {
        self.pitch = degrees;
        self
    }

    /// Yaw in degrees.
    #[must_use]
    pub const fn yaw(mut self, degrees: f64) -> Self {
        self.yaw = degrees;
        self
    }

    /// Roll in degrees.
    #[must_use]
    pub const fn roll(mut self, degrees: f64) -> Self {
        self.roll = degrees;
        self
    }

    /// Camera distance in model units; larger means a smaller face.
    #[must_use]
    pub const fn distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Eye aspect ratio of the left and right eye.
    #[must_use]
    pub const fn eyes(mut self, left: f64, right: f64) -> Self {
        self.left_eye = left;
        self.right_eye = right;
        self
    }

    /// Overrides the normalized y of the forehead landmark.
    #[must_use]
    pub const fn forehead_y(mut self, y: f32) -> Self {
        self.forehead_y = Some(y);
        self
    }

    /// Overrides the normalized y of the chin landmark.
    #[must_use]
    pub const fn chin_y(mut self, y: f32) -> Self {
        self.chin_y = Some(y);
        self
    }

    /// Detection confidence.
    #[must_use]
    pub const fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    fn project(&self, model: [f64; 3]) -> Vector2<f64> {
        let camera = CameraModel::for_image(self.width, self.height);
        let rotation = euler_to_rotation(
            self.pitch.to_radians(),
            self.yaw.to_radians(),
            self.roll.to_radians(),
        );
        let point = rotation * Vector3::new(model[0], model[1], model[2])
            + Vector3::new(0.0, 0.0, self.distance);
        camera
            .project(&point)
            .unwrap_or_else(|| Vector2::new(camera.cx, camera.cy))
    }

    fn normalize(&self, p: Vector2<f64>) -> Landmark {
        Landmark::new(
            (p.x / f64::from(self.width)) as f32,
            (p.y / f64::from(self.height)) as f32,
            0.0,
        )
    }

    /// Builds the mesh.
    #[must_use]
    pub fn build(&self) -> FaceMesh {
        let mut pixels = vec![Vector2::zeros(); MESH_POINTS];
        let mut nose = Vector2::new(0.0, 0.0);
        for (index, model) in FACE_MODEL {
            pixels[index] = self.project(model);
            if index == 1 {
                nose = pixels[index];
            }
        }
        for (index, p) in pixels.iter_mut().enumerate() {
            if !FACE_MODEL.iter().any(|(i, _)| *i == index) {
                *p = nose;
            }
        }

        let span = (pixels[RIGHT_EYE[3]] - pixels[LEFT_EYE[0]]).norm();
        let eye_width = span * 0.3;

        // left eye runs inward from its outer corner (33)
        let origin = pixels[LEFT_EYE[0]];
        draw_eye(&mut pixels, &LEFT_EYE, origin, eye_width, self.left_eye);
        // right eye ends at its outer corner (263)
        let origin = pixels[RIGHT_EYE[3]] - Vector2::new(eye_width, 0.0);
        draw_eye(&mut pixels, &RIGHT_EYE, origin, eye_width, self.right_eye);

        pixels[TOP_OF_HEAD] = self.project(FOREHEAD_MODEL);
        pixels[CHIN] = self.project(CHIN_MODEL);

        let mut landmarks: Vec<Landmark> = pixels.iter().map(|p| self.normalize(*p)).collect();
        if let Some(y) = self.forehead_y {
            landmarks[TOP_OF_HEAD].y = y;
        }
        if let Some(y) = self.chin_y {
            landmarks[CHIN].y = y;
        }
        FaceMesh::new(landmarks, self.score)
    }
}

/// Writes `<dir>/<image_name>.faces.json` listing the given meshes, in the
/// format the sidecar perception adapter reads.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_sidecar(
    dir: &Path,
    image_name: &str,
    meshes: &[FaceMesh],
) -> anyhow::Result<PathBuf> {
    let faces: Vec<serde_json::Value> = meshes
        .iter()
        .map(|mesh| {
            let landmarks: Vec<[f32; 3]> =
                mesh.landmarks.iter().map(|l| [l.x, l.y, l.z]).collect();
            serde_json::json!({ "score": mesh.score, "landmarks": landmarks })
        })
        .collect();
    let path = dir.join(format!("{image_name}.faces.json"));
    std::fs::write(&path, serde_json::json!({ "faces": faces }).to_string())?;
    Ok(path)
}

/// Places p1..p6 so that EAR = `openness`.
fn draw_eye(
    pixels: &mut [Vector2<f64>],
    indices: &[usize; 6],
    p1: Vector2<f64>,
    width: f64,
    openness: f64,
) {
    let half = openness * width / 2.0;
    let offsets = [
        (0.0, 0.0),
        (width / 3.0, -half),
        (2.0 * width / 3.0, -half),
        (width, 0.0),
        (2.0 * width / 3.0, half),
        (width / 3.0, half),
    ];
    for (&index, (dx, dy)) in indices.iter().zip(offsets) {
        pixels[index] = p1 + Vector2::new(dx, dy);
    }
}
