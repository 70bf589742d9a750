//! Typed error taxonomy shared across the workspace.
//!
//! Library crates return `Result<_, VesselError>`; the CLI and the volume
//! I/O collaborator wrap failures with `anyhow::Context` at their own
//! boundary. Numeric degeneracies (non-finite Hessian entries at a voxel)
//! are deliberately *not* errors: they are recovered locally with a zero
//! response and surfaced as a counter in the run report.

use thiserror::Error;

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum VesselError {
    /// A parameter failed validation before any volume was allocated.
    #[error("invalid parameter: {what}")]
    InvalidParameter {
        /// Human-readable description of the offending parameter.
        what: String,
    },

    /// Two volumes that must share a grid do not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Shape of the reference volume.
        expected: (usize, usize, usize),
        /// Shape of the offending volume.
        found: (usize, usize, usize),
    },

    /// Cooperative cancellation was requested and honored at a scale boundary.
    #[error("cancelled at a scale boundary")]
    Cancelled,
}

impl VesselError {
    /// Shorthand constructor for [`VesselError::InvalidParameter`].
    #[must_use]
    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidParameter { what: what.into() }
    }
}

/// Workspace-wide result alias.
pub type Result<T, E = VesselError> = std::result::Result<T, E>;
