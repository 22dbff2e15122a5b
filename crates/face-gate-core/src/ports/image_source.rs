//! Image source port for enumerating input images.

use crate::domain::ImageRecord;

/// Port for enumerating the images of one run.
pub trait ImageSource: Send + Sync {
    /// Returns every image record, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated at all.
    fn records(&self) -> anyhow::Result<Vec<ImageRecord>>;
}
