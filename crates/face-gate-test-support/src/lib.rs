//! Test support utilities for face-gate.
//!
//! Provides mocks of the core ports, synthetic image builders, and a face
//! mesh builder that places landmarks for a chosen head pose and eye state.
//!
//! # Example
//!
//! ```
//! use face_gate_test_support::{FaceMeshBuilder, MockPerception};
//!
//! let mesh = FaceMeshBuilder::new(640, 480).yaw(-25.0).build();
//! let perception = MockPerception::new().with_face("turned.png", mesh);
//! ```

mod builders;
mod mocks;

pub use builders::{write_sidecar, FaceMeshBuilder, SyntheticImageBuilder, MESH_POINTS};
pub use mocks::{
    MemoryReportSink, MemoryRouter, MockImageSource, MockPerception, MockProgressSink,
    RoutedCopy,
};
