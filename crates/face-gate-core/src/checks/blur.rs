//! Blur check: variance of the Laplacian.
//!
//! Sharp images have strong second derivatives at edges, so the Laplacian
//! response spreads widely. A blurry or flat image keeps it near zero.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;
use tracing::debug;

use super::{CheckContext, FaceCheck};
use crate::domain::{labels::blur, BoundingBox, CheckKind, CheckOutcome, DetectionOptions};

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Fill for face-box pixels that fall outside the image.
const NEUTRAL_GRAY: u8 = 128;

/// Configuration for the blur check.
#[derive(Debug, Clone, Copy)]
pub struct BlurConfig {
    /// Variance below this is blurry. Must be positive.
    pub threshold: f64,
    /// Measure only the detected face instead of the whole frame.
    pub face_region: bool,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            face_region: false,
        }
    }
}

/// Population variance of the 3x3 Laplacian response.
#[must_use]
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    if gray.width() == 0 || gray.height() == 0 {
        return 0.0;
    }
    let gray_f32: GrayF32 = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([f32::from(gray.get_pixel(x, y).0[0])])
    });
    let response: Vec<f32> = filter3x3(&gray_f32, &LAPLACIAN).into_raw();

    let n = response.len() as f64;
    let mean = response.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    response
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// Copies the face box out of `gray`, filling the part beyond the image with
/// neutral gray.
fn face_crop(gray: &GrayImage, bbox: &BoundingBox) -> Option<GrayImage> {
    if bbox.width <= 0 || bbox.height <= 0 {
        return None;
    }
    let (w, h) = (i64::from(gray.width()), i64::from(gray.height()));
    let overlaps = i64::from(bbox.right()) > 0
        && i64::from(bbox.bottom()) > 0
        && i64::from(bbox.x) < w
        && i64::from(bbox.y) < h;
    if !overlaps {
        return None;
    }
    Some(GrayImage::from_fn(
        bbox.width as u32,
        bbox.height as u32,
        |cx, cy| {
            let x = i64::from(bbox.x) + i64::from(cx);
            let y = i64::from(bbox.y) + i64::from(cy);
            if (0..w).contains(&x) && (0..h).contains(&y) {
                *gray.get_pixel(x as u32, y as u32)
            } else {
                Luma([NEUTRAL_GRAY])
            }
        },
    ))
}

/// Flags images whose Laplacian variance falls below the threshold.
pub struct BlurCheck {
    config: BlurConfig,
}

impl BlurCheck {
    #[must_use]
    pub const fn new(config: BlurConfig) -> Self {
        Self { config }
    }

    /// Classifies a grayscale image or face crop.
    #[must_use]
    pub fn classify(&self, gray: &GrayImage) -> CheckOutcome {
        let variance = laplacian_variance(gray);
        debug!("Laplacian variance {variance:.2}");
        if variance < self.config.threshold {
            CheckOutcome::fail(blur::BLURRY)
        } else {
            CheckOutcome::pass(blur::SHARP)
        }
    }
}

impl Default for BlurCheck {
    fn default() -> Self {
        Self::new(BlurConfig::default())
    }
}

impl FaceCheck for BlurCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Blur
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutcome> {
        if self.config.threshold.is_nan() || self.config.threshold <= 0.0 {
            return Ok(CheckOutcome::Unusable {
                label: blur::INVALID_THRESHOLD,
            });
        }

        let gray = ctx.image.to_luma8();
        if !self.config.face_region {
            return Ok(self.classify(&gray));
        }

        let detection = match ctx
            .perception
            .detect_face(ctx.image, &DetectionOptions::default())
        {
            Ok(Some(detection)) => detection,
            Ok(None) => return Ok(CheckOutcome::DetectionAbsent { label: blur::NO_FACE }),
            Err(e) => return Ok(CheckOutcome::fault("during blur check", &e)),
        };
        let bbox = detection.bbox.to_pixels(ctx.image.width, ctx.image.height);
        match face_crop(&gray, &bbox) {
            Some(crop) => Ok(self.classify(&crop)),
            None => Ok(CheckOutcome::Unusable {
                label: blur::INVALID_REGION,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::checks::LandmarkResult;
    use crate::domain::{FaceDetection, FaceMesh, ImageInfo, RelativeBox};
    use crate::ports::FacePerception;

    /// Reports one fixed face box, or none, or a detector error.
    struct FixedFace(Result<Option<RelativeBox>, &'static str>);

    impl FacePerception for FixedFace {
        fn face_mesh(
            &self,
            _: &ImageInfo,
            _: &DetectionOptions,
        ) -> anyhow::Result<Option<FaceMesh>> {
            Ok(None)
        }

        fn detect_face(
            &self,
            _: &ImageInfo,
            _: &DetectionOptions,
        ) -> anyhow::Result<Option<FaceDetection>> {
            match self.0 {
                Ok(bbox) => Ok(bbox.map(|bbox| FaceDetection { score: 0.9, bbox })),
                Err(message) => anyhow::bail!(message),
            }
        }
    }

    const CENTER: RelativeBox = RelativeBox {
        xmin: 0.25,
        ymin: 0.25,
        width: 0.5,
        height: 0.5,
    };

    /// Checkerboard frame with a flat gray square over the center half.
    fn flat_face_image() -> ImageInfo {
        let board = checkerboard(100, 4);
        let gray = GrayImage::from_fn(100, 100, |x, y| {
            if (25..75).contains(&x) && (25..75).contains(&y) {
                Luma([120])
            } else {
                *board.get_pixel(x, y)
            }
        });
        ImageInfo::new("face.png", image::DynamicImage::ImageLuma8(gray))
    }

    fn evaluate(
        check: &BlurCheck,
        image: &ImageInfo,
        perception: &dyn FacePerception,
    ) -> CheckOutcome {
        let landmarks = LandmarkResult::no_face();
        let ctx = CheckContext {
            image,
            landmarks: &landmarks,
            perception,
        };
        check.evaluate(&ctx).unwrap()
    }

    fn face_region_check() -> BlurCheck {
        BlurCheck::new(BlurConfig {
            face_region: true,
            ..BlurConfig::default()
        })
    }

    fn checkerboard(size: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_uniform_variance_is_zero() {
        let gray = GrayImage::from_pixel(64, 48, Luma([137]));
        assert!(laplacian_variance(&gray).abs() < f64::EPSILON);
        let outcome = BlurCheck::default().classify(&gray);
        assert_eq!(outcome, CheckOutcome::fail(blur::BLURRY));
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let gray = checkerboard(64, 4);
        assert!(laplacian_variance(&gray) > 1000.0);
        assert_eq!(
            BlurCheck::default().classify(&gray),
            CheckOutcome::pass(blur::SHARP)
        );
    }

    #[test]
    fn test_smoothing_lowers_variance() {
        let sharp = checkerboard(64, 8);
        let smooth = imageproc::filter::gaussian_blur_f32(&sharp, 3.0);
        assert!(laplacian_variance(&smooth) < laplacian_variance(&sharp));
    }

    #[test]
    fn test_face_crop_fills_outside() {
        let gray = GrayImage::from_pixel(10, 10, Luma([20]));
        let crop = face_crop(&gray, &BoundingBox::new(-2, 5, 4, 8)).unwrap_or_default();
        assert_eq!(crop.dimensions(), (4, 8));
        assert_eq!(crop.get_pixel(0, 0).0[0], NEUTRAL_GRAY);
        assert_eq!(crop.get_pixel(3, 0).0[0], 20);
        assert_eq!(crop.get_pixel(3, 7).0[0], NEUTRAL_GRAY);
    }

    #[test]
    fn test_face_crop_rejects_degenerate() {
        let gray = GrayImage::from_pixel(10, 10, Luma([20]));
        assert!(face_crop(&gray, &BoundingBox::new(0, 0, 0, 5)).is_none());
        assert!(face_crop(&gray, &BoundingBox::new(20, 20, 5, 5)).is_none());
    }

    #[test]
    fn test_face_region_measures_only_the_face() {
        let image = flat_face_image();
        let perception = FixedFace(Ok(Some(CENTER)));

        assert_eq!(
            evaluate(&BlurCheck::default(), &image, &perception),
            CheckOutcome::pass(blur::SHARP)
        );
        assert_eq!(
            evaluate(&face_region_check(), &image, &perception),
            CheckOutcome::fail(blur::BLURRY)
        );
    }

    #[test]
    fn test_face_region_sharp_face() {
        let board = checkerboard(100, 4);
        let image = ImageInfo::new("sharp.png", image::DynamicImage::ImageLuma8(board));
        let outcome = evaluate(&face_region_check(), &image, &FixedFace(Ok(Some(CENTER))));
        assert_eq!(outcome, CheckOutcome::pass(blur::SHARP));
    }

    #[test]
    fn test_face_region_without_face() {
        let outcome = evaluate(&face_region_check(), &flat_face_image(), &FixedFace(Ok(None)));
        assert_eq!(
            outcome,
            CheckOutcome::DetectionAbsent {
                label: blur::NO_FACE
            }
        );
    }

    #[test]
    fn test_face_region_degenerate_box() {
        let sliver = RelativeBox {
            width: 0.0,
            ..CENTER
        };
        let outcome = evaluate(
            &face_region_check(),
            &flat_face_image(),
            &FixedFace(Ok(Some(sliver))),
        );
        assert_eq!(
            outcome,
            CheckOutcome::Unusable {
                label: blur::INVALID_REGION
            }
        );
    }

    #[test]
    fn test_face_region_detector_error_is_fault() {
        let outcome = evaluate(
            &face_region_check(),
            &flat_face_image(),
            &FixedFace(Err("detector offline")),
        );
        assert!(outcome.is_fault());
        assert!(outcome.message().contains("detector offline"));
    }

    #[test]
    fn test_non_positive_threshold_is_unusable() {
        for threshold in [0.0, -5.0, f64::NAN] {
            for face_region in [false, true] {
                let check = BlurCheck::new(BlurConfig {
                    threshold,
                    face_region,
                });
                let outcome = evaluate(&check, &flat_face_image(), &FixedFace(Ok(Some(CENTER))));
                assert_eq!(
                    outcome,
                    CheckOutcome::Unusable {
                        label: blur::INVALID_THRESHOLD
                    },
                    "threshold {threshold}"
                );
            }
        }
    }
}
