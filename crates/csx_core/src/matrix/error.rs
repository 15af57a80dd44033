use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsrError {
    #[error("out of bounds index: {index} (max: {max})")]
    OutOfBoundsIndex { index: usize, max: usize },

    #[error("invalid row pointers length: {expected} (actual: {actual})")]
    InvalidRowPointersLength { expected: usize, actual: usize },

    #[error("invalid row pointers: {index} (expected: {expected}, actual: {actual})")]
    InvalidRowPointers {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("column indices values length mismatch: {values} (actual: {column_indices})")]
    ColumnIndicesValuesLengthMismatch {
        values: usize,
        column_indices: usize,
    },

    #[error("columns not strictly increasing: {index} (expected: {expected}, actual: {actual})")]
    ColumnsNotStrictlyIncreasing {
        index: usize,
        expected: usize,
        actual: usize,
    },
}
