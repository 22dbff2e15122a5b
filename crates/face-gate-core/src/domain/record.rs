//! Input image identity and decoded image data.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::GenericImageView;

/// An image discovered while walking the input tree.
///
/// Identity is the full path; the file name doubles as the row key in the
/// report tables and as the copy name in every outcome folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageRecord {
    /// Full path to the source file.
    pub path: PathBuf,
    /// File name without directories.
    pub file_name: String,
}

impl ImageRecord {
    /// Creates a record for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path.file_name().map_or_else(
            || path.to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        );
        Self { path, file_name }
    }
}

/// A decoded image handed to the checks.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Path to the image file.
    pub path: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Decoded image data.
    pub image: image::DynamicImage,
}

impl ImageInfo {
    /// Wraps an already decoded image.
    #[must_use]
    pub fn new(path: impl Into<String>, image: image::DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            path: path.into(),
            width,
            height,
            image,
        }
    }

    /// Decodes an image from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;
        Ok(Self::new(path.to_string_lossy(), image))
    }

    /// Returns the image as 8-bit RGB.
    #[must_use]
    pub fn to_rgb8(&self) -> image::RgbImage {
        self.image.to_rgb8()
    }

    /// Returns the image as 8-bit grayscale.
    #[must_use]
    pub fn to_luma8(&self) -> image::GrayImage {
        self.image.to_luma8()
    }

    /// File name component of the path, used to key perception lookups.
    #[must_use]
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }
}
