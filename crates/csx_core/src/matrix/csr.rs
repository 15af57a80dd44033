use crate::matrix::Dim;
use crate::matrix::error::CsrError;

/// A CSR-like view of an externally materialised sparse matrix.
///
/// This is the ingress boundary named in spec.md §1 ("The core receives an
/// already materialised CSR or a coordinate iterator") — Matrix-Market
/// parsing and CSR assembly from a coordinate stream are out of scope here.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    pub dim: Dim,
    /// Row pointers, len = nrows + 1
    pub row_pointers: Vec<usize>,
    /// Column indices, len = nnz
    pub column_indices: Vec<usize>,
    /// Nonzero values, len = nnz
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// number of non zero values
    pub fn nnz(&self) -> usize {
        self.column_indices.len()
    }

    #[allow(clippy::collapsible_if)]
    pub fn check_invariants(&self) -> Result<(), CsrError> {
        if self.row_pointers.len() != self.dim.nrows + 1 {
            return Err(CsrError::InvalidRowPointersLength {
                expected: self.dim.nrows + 1,
                actual: self.row_pointers.len(),
            });
        }
        if *self.row_pointers.first().unwrap_or(&1) != 0 {
            return Err(CsrError::InvalidRowPointers {
                index: 0,
                expected: 0,
                actual: *self.row_pointers.first().unwrap_or(&1),
            });
        }
        if *self.row_pointers.last().unwrap() != self.nnz() {
            return Err(CsrError::InvalidRowPointers {
                index: self.dim.nrows,
                expected: self.nnz(),
                actual: *self.row_pointers.last().unwrap(),
            });
        }
        if self.column_indices.len() != self.values.len() {
            return Err(CsrError::ColumnIndicesValuesLengthMismatch {
                values: self.values.len(),
                column_indices: self.column_indices.len(),
            });
        }
        // per-row monotone, strictly increasing, in-range
        for i in 0..self.dim.nrows {
            let (start, end) = (self.row_pointers[i], self.row_pointers[i + 1]);
            if start > end || end > self.nnz() {
                return Err(CsrError::InvalidRowPointers {
                    index: i,
                    expected: start,
                    actual: end,
                });
            }
            let mut prev = None;
            for &c in &self.column_indices[start..end] {
                if c >= self.dim.ncols {
                    return Err(CsrError::OutOfBoundsIndex {
                        index: c,
                        max: self.dim.ncols,
                    });
                }
                if let Some(p) = prev {
                    if c <= p {
                        return Err(CsrError::ColumnsNotStrictlyIncreasing {
                            index: i,
                            expected: p,
                            actual: c,
                        });
                    }
                }
                prev = Some(c);
            }
        }
        Ok(())
    }

    /// Return (column_indices, values) slice for row i
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (s, e) = (self.row_pointers[i], self.row_pointers[i + 1]);
        (&self.column_indices[s..e], &self.values[s..e])
    }

    pub fn row_start(&self, i: usize) -> usize {
        self.row_pointers[i]
    }

    pub fn col_index(&self, k: usize) -> usize {
        self.column_indices[k]
    }

    /// Reference `y <- alpha * A * x + beta * y`, used by tests to check the
    /// encoded CSX kernel against an unoptimised baseline (spec.md §8).
    pub fn spmv_reference(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
        assert_eq!(x.len(), self.dim.ncols);
        assert_eq!(y.len(), self.dim.nrows);
        for i in 0..self.dim.nrows {
            let (cols, vals) = self.row(i);
            let mut acc = 0.0;
            for (&c, &v) in cols.iter().zip(vals) {
                acc += v * x[c];
            }
            y[i] = alpha * acc + beta * y[i];
        }
    }
}
