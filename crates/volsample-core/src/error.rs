//! Error types for volsample.

use thiserror::Error;

use crate::cell::CellType;

/// The main error type for volsample operations.
///
/// Routine outcomes such as "no cell contains this point" or "this cell is
/// degenerate" are not errors; they surface as `None` or as skipped cells.
/// The variants here describe caller defects or explicit interruption.
#[derive(Error, Debug)]
pub enum VolSampleError {
    /// A cell of a topology the operation cannot handle.
    #[error("unsupported primitive: cell {cell} has type {cell_type:?}")]
    UnsupportedCell { cell: usize, cell_type: CellType },

    /// A requested variable does not exist on the mesh.
    #[error("variable '{0}' not found on mesh")]
    UnknownVariable(String),

    /// More variables requested than a sample point can carry.
    #[error("too many variables: requested {requested}, limit is {limit}")]
    TooManyVariables { requested: usize, limit: usize },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Options failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The operation observed a cancellation request.
    #[error("cancelled after {processed} cells")]
    Cancelled { processed: usize },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for volsample operations.
pub type Result<T> = std::result::Result<T, VolSampleError>;
