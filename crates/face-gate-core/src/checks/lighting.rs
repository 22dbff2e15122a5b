//! Lighting check: face exposure and backlight.
//!
//! Brightness is the HSV value channel, `max(R, G, B)`. The face is measured
//! on the detection box trimmed by a margin on each side; the background is
//! every non-black pixel outside the untrimmed box.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use image::RgbImage;
use tracing::debug;

use super::{CheckContext, FaceCheck};
use crate::domain::{
    labels::lighting, BoundingBox, CheckKind, CheckOutcome, DetectionOptions, DetectionRange,
    Thresholds,
};

/// Detector options for the lighting check: full-range profile.
pub const LIGHTING_DETECTION: DetectionOptions = DetectionOptions {
    max_faces: 1,
    min_confidence: 0.5,
    refine_landmarks: false,
    range: DetectionRange::Full,
};

/// Configuration for the lighting check.
#[derive(Debug, Clone, Copy)]
pub struct LightingConfig {
    pub dark_threshold: f64,
    pub bright_threshold: f64,
    pub diff_threshold: f64,
    pub margin: f64,
}

impl From<&Thresholds> for LightingConfig {
    fn from(t: &Thresholds) -> Self {
        Self {
            dark_threshold: t.dark_threshold,
            bright_threshold: t.bright_threshold,
            diff_threshold: t.diff_threshold,
            margin: t.margin,
        }
    }
}

/// Mean brightness of the face interior and of the background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessSample {
    pub face: f64,
    /// `None` when no background pixel is brighter than black.
    pub background: Option<f64>,
}

fn value(pixel: &image::Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    r.max(g).max(b)
}

/// Measures face and background brightness.
///
/// Returns `None` when the trimmed face region is empty.
#[must_use]
pub fn measure_brightness(
    image: &RgbImage,
    bbox: &BoundingBox,
    margin: f64,
) -> Option<BrightnessSample> {
    let (w, h) = (f64::from(image.width()), f64::from(image.height()));
    let (bx, by) = (f64::from(bbox.x), f64::from(bbox.y));
    let (bw, bh) = (f64::from(bbox.width), f64::from(bbox.height));

    let x_start = (bx + bw * margin).trunc().max(0.0);
    let y_start = (by + bh * margin).trunc().max(0.0);
    let x_end = (bx + bw * (1.0 - margin)).trunc().min(w);
    let y_end = (by + bh * (1.0 - margin)).trunc().min(h);
    if x_end <= x_start || y_end <= y_start {
        return None;
    }

    let (x_start, y_start) = (x_start as u32, y_start as u32);
    let (x_end, y_end) = (x_end as u32, y_end as u32);

    let mut face_sum = 0u64;
    let mut face_count = 0u64;
    let mut bg_sum = 0u64;
    let mut bg_count = 0u64;
    for (x, y, pixel) in image.enumerate_pixels() {
        let v = value(pixel);
        if (x_start..x_end).contains(&x) && (y_start..y_end).contains(&y) {
            face_sum += u64::from(v);
            face_count += 1;
        }
        let inside_box = match (i32::try_from(x), i32::try_from(y)) {
            (Ok(x), Ok(y)) => bbox.contains(x, y),
            _ => false,
        };
        if !inside_box && v > 0 {
            bg_sum += u64::from(v);
            bg_count += 1;
        }
    }

    if face_count == 0 {
        return None;
    }
    Some(BrightnessSample {
        face: face_sum as f64 / face_count as f64,
        background: (bg_count > 0).then(|| bg_sum as f64 / bg_count as f64),
    })
}

/// Classifies a brightness sample: too dark, too bright, backlit, in that order.
#[must_use]
pub fn classify_lighting(sample: &BrightnessSample, config: &LightingConfig) -> CheckOutcome {
    if sample.face < config.dark_threshold {
        return CheckOutcome::fail(lighting::TOO_DARK);
    }
    if sample.face > config.bright_threshold {
        return CheckOutcome::fail(lighting::TOO_BRIGHT);
    }
    if let Some(background) = sample.background {
        if (sample.face - background).abs() > config.diff_threshold {
            return CheckOutcome::fail(lighting::BACKLIGHT);
        }
    }
    CheckOutcome::pass(lighting::NORMAL)
}

/// Flags under- and overexposed faces and strong backlight.
pub struct LightingCheck {
    config: LightingConfig,
}

impl LightingCheck {
    #[must_use]
    pub const fn new(config: LightingConfig) -> Self {
        Self { config }
    }
}

impl FaceCheck for LightingCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Lighting
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome> {
        let detection = match ctx.perception.detect_face(ctx.image, &LIGHTING_DETECTION) {
            Ok(Some(detection)) => detection,
            Ok(None) => {
                return Ok(CheckOutcome::DetectionAbsent {
                    label: lighting::NO_FACE,
                })
            }
            Err(e) => return Ok(CheckOutcome::fault("during lighting check", &e)),
        };

        let bbox = detection.bbox.to_pixels(ctx.image.width, ctx.image.height);
        let rgb = ctx.image.to_rgb8();
        let Some(sample) = measure_brightness(&rgb, &bbox, self.config.margin) else {
            debug!("Empty face crop {bbox:?} in {}", ctx.image.path);
            return Ok(CheckOutcome::Unusable {
                label: lighting::INVALID_CROP,
            });
        };

        debug!(
            "Brightness face={:.1} background={:?}",
            sample.face, sample.background
        );
        Ok(classify_lighting(&sample, &self.config))
    }
}
