//! Outcome router port: sorts source images into label folders.

use crate::domain::{CheckKind, CheckOutcome, ImageRecord};

/// Port for placing a copy of each image under its outcome folder.
pub trait OutcomeRouter: Send + Sync {
    /// Creates every `<check>/<label>` destination up front.
    ///
    /// # Errors
    ///
    /// Returns an error if a destination cannot be created.
    fn prepare(&self) -> anyhow::Result<()>;

    /// Places the image under the outcome's folder for `check`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn route(
        &self,
        record: &ImageRecord,
        check: CheckKind,
        outcome: &CheckOutcome,
    ) -> anyhow::Result<()>;
}
