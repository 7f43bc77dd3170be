//! Error types for the MPM core

use thiserror::Error;

/// Precondition violations reported by nodes, the property pool and the MLS engine.
///
/// Numerical degeneracies (near-zero mass, singular moment matrix) are not
/// errors; they surface as `false` or `None` from the operation itself.
#[derive(Error, Debug)]
pub enum MpmError {
    #[error("Invalid spline order {0}, expected 2 (quadratic) or 3 (cubic)")]
    InvalidSplineOrder(u32),

    #[error("No data points supplied to the interpolation")]
    EmptyDataPoints,

    #[error("Invalid kernel span {0}, must be finite and positive")]
    InvalidSpan(f64),

    #[error("Field values do not match data points: expected {expected}, found {found}")]
    FieldLengthMismatch { expected: usize, found: usize },

    #[error("Invalid phase {phase}, node has {nphases} phase(s)")]
    InvalidPhase { phase: usize, nphases: usize },

    #[error("Invalid direction {direction}, must be less than {limit}")]
    InvalidDirection { direction: usize, limit: usize },

    #[error("Rotation matrix is not invertible")]
    SingularRotation,

    #[error("Nodal property '{0}' not found in pool")]
    PropertyNotFound(String),

    #[error("Nodal property '{0}' already exists in pool")]
    DuplicateProperty(String),

    #[error("Nodal property '{name}' has no entry for node {node}, material {material}")]
    PropertyIndexOutOfRange {
        name: String,
        node: usize,
        material: usize,
    },

    #[error("Nodal property '{name}' expects {expected} value(s), found {found}")]
    PropertySizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Node {0} has no nodal property handle")]
    MissingPropertyHandle(u64),

    #[error("Invalid function: {0}")]
    InvalidFunction(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for MPM core operations
pub type MpmResult<T> = Result<T, MpmError>;
