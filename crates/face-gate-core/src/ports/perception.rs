//! Perception port: landmark meshes and face detections.

use crate::domain::{DetectionOptions, FaceDetection, FaceMesh, ImageInfo};

/// External face perception runtime.
///
/// "No face" is `Ok(None)`. An `Err` means perception itself failed, which the
/// calling check turns into a fault outcome.
pub trait FacePerception: Send + Sync {
    /// Returns the dense landmark mesh of the first face, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the perception runtime fails.
    fn face_mesh(
        &self,
        image: &ImageInfo,
        options: &DetectionOptions,
    ) -> anyhow::Result<Option<FaceMesh>>;

    /// Returns the first face detection, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the perception runtime fails.
    fn detect_face(
        &self,
        image: &ImageInfo,
        options: &DetectionOptions,
    ) -> anyhow::Result<Option<FaceDetection>>;
}
