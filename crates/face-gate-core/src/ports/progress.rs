//! Progress reporting port for UI integration.

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Processing started for an image.
    Started {
        /// Path to the image.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch.
        total: usize,
    },
    /// An image finished with a complete row.
    Completed {
        /// File name of the image.
        image_name: String,
        /// Number of checks that did not pass.
        failed_checks: usize,
    },
    /// An image panicked or overran its deadline; a fallback row was recorded.
    Faulted {
        /// Path to the image.
        path: String,
        /// What went wrong.
        reason: String,
    },
    /// The report tables were written.
    Flushed {
        /// Rows in the written report.
        rows: usize,
    },
    /// All images have been processed.
    Finished {
        /// Total images processed.
        processed: usize,
        /// Copy or report writes that failed.
        write_failures: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
