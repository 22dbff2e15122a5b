//! Filesystem adapter for enumerating input images.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use face_gate_core::{ImageRecord, ImageSource};
use tracing::{debug, warn};

/// Supported image extensions, matched case-insensitively.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Recursive filesystem image source rooted at one directory.
pub struct FsImageSource {
    root: PathBuf,
    exclude: Option<PathBuf>,
}

impl FsImageSource {
    /// Creates a source walking `root` recursively.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: None,
        }
    }

    /// Skips a subtree, typically the output root when it sits inside the input.
    #[must_use]
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude = Some(dir.into());
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.as_ref().is_some_and(|excluded| {
            path == excluded
                || match (path.canonicalize(), excluded.canonicalize()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
        })
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            } else if path.is_dir() {
                if self.is_excluded(&path) {
                    debug!("Skipping {}", path.display());
                    continue;
                }
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn records(&self) -> Result<Vec<ImageRecord>> {
        if !self.root.is_dir() {
            bail!("Input directory does not exist: {}", self.root.display());
        }
        let mut files = Vec::new();
        self.collect_from_dir(&self.root, &mut files);
        files.sort();
        debug!("Found {} image files under {}", files.len(), self.root.display());
        Ok(files.into_iter().map(ImageRecord::new).collect())
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
