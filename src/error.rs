//! Error types for the membrane simulation.
//!
//! Every failure is local and synchronous: it is returned at the point of
//! detection and never clamped away or retried.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// Field evaluated inside the forbidden core around the singularity.
    #[error("deformation field evaluated at r = {r:.6e}, inside the forbidden core r < {limit:.6e}")]
    Domain { r: f64, limit: f64 },

    /// Collision radius must lie in `[r_c / 2, escape)`.
    #[error("invalid boundaries: collision radius {collision} must be at least r_c / 2 and below escape radius {escape}")]
    InvalidBoundary { collision: f64, escape: f64 },

    /// Initial position outside the annulus `r_c <= r <= R`.
    #[error("initial radius {r} outside the valid annulus [{min}, {max}]")]
    InvalidInitialState { r: f64, min: f64, max: f64 },

    /// Calibration needs at least two reference samples.
    #[error("reference trajectory has {samples} sample(s), at least 2 are required")]
    EmptyReference { samples: usize },

    #[error("invalid reference trajectory: {message}")]
    InvalidReference { message: String },

    #[error("invalid physical parameters: {message}")]
    InvalidParameters { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl SimError {
    pub(crate) fn parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn reference(message: impl Into<String>) -> Self {
        Self::InvalidReference {
            message: message.into(),
        }
    }
}
