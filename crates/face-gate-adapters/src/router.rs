//! Filesystem outcome router: `<root>/<check>/<label>/<file>`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use face_gate_core::domain::{CheckKind, CheckOutcome, ImageRecord};
use face_gate_core::OutcomeRouter;
use tracing::debug;

/// Copies each source image, unmodified, into its outcome folder.
pub struct FsOutcomeRouter {
    root: PathBuf,
}

impl FsOutcomeRouter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Folder for one check and label.
    #[must_use]
    pub fn folder(&self, check: CheckKind, label: &str) -> PathBuf {
        self.root.join(check.name()).join(label)
    }
}

impl OutcomeRouter for FsOutcomeRouter {
    fn prepare(&self) -> Result<()> {
        for check in CheckKind::ALL {
            for label in check.labels() {
                let dir = self.folder(check, label);
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }
        debug!("Prepared outcome folders under {}", self.root.display());
        Ok(())
    }

    fn route(&self, record: &ImageRecord, check: CheckKind, outcome: &CheckOutcome) -> Result<()> {
        let dir = self.folder(check, outcome.folder());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let dest = dir.join(&record.file_name);
        std::fs::copy(&record.path, &dest).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                record.path.display(),
                dest.display()
            )
        })?;
        Ok(())
    }
}
