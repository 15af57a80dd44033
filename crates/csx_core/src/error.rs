use thiserror::Error;

use crate::matrix::error::CsrError;

/// Crate-wide error type, following the fatal/recoverable/environmental
/// taxonomy of spec.md §7.
///
/// `Warning` carries recoverable heuristics failures (an unknown tuning
/// option, an encoding type that could not be applied, reordering that was
/// infeasible on the given matrix): the pipeline logs these via `log::warn!`
/// and proceeds with a safe default rather than failing the whole tuning
/// operation.
#[derive(Debug, Error)]
pub enum CsxError {
    #[error(transparent)]
    InvalidInput(#[from] CsrError),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimMismatch { expected: usize, actual: usize },

    #[error("index out of bounds: {index} (max {max})")]
    IndexOutOfBounds { index: usize, max: usize },

    #[error("entry not found at (row={row}, col={col})")]
    EntryNotFound { row: usize, col: usize },

    #[error("tuned matrix is invalid: {0}")]
    TunedMatrixInvalid(String),

    #[error("input matrix is invalid: {0}")]
    InputMatrixInvalid(String),

    #[error("too many distinct pattern types for a 6-bit ctl flag (max 64): {0}")]
    TooManyPatternTypes(usize),

    #[error("reordering failed: {0}")]
    ReorderFailed(String),

    #[error("worker thread panicked during execution")]
    WorkerPanicked,

    #[error("file I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("CSX image does not match current architecture/configuration: {0}")]
    IncompatibleImage(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// A recoverable heuristics failure: the caller already has a usable
    /// (if suboptimal) result and does not need to treat this as fatal.
    #[error("warning: {0}")]
    Warning(String),
}

pub type CsxResult<T> = Result<T, CsxError>;
