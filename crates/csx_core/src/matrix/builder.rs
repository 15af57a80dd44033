use crate::matrix::Dim;
use crate::matrix::csr::CsrMatrix;
use crate::matrix::error::CsrError;

/// Builder from triplets (COO → canonical CSR), used by tests and small
/// tools to assemble a matrix without going through a real ingress path.
///
/// Usage:
///   let mut b = MatrixBuilder::new(nrows, ncols);
///   b.reserve(nnz_guess);
///   b.push(col, row, v); ...
///   let a = b.build();
#[derive(Debug)]
pub struct MatrixBuilder {
    dim: Dim,
    /// Sorted triplets (column, row, value)
    entries: Vec<(usize, usize, f64)>,
    /// If true, keep explicit zeros (as stored entries) instead of dropping them.
    keep_zeros: bool,
}

impl MatrixBuilder {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            dim: Dim { nrows, ncols },
            entries: Vec::new(),
            keep_zeros: false,
        }
    }

    pub fn new_keep_zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            dim: Dim { nrows, ncols },
            entries: Vec::new(),
            keep_zeros: true,
        }
    }

    pub fn reserve(&mut self, nnz: usize) {
        self.entries.reserve(nnz);
    }

    /// push a COO (column, row, value) tuple
    pub fn push(&mut self, column: usize, row: usize, value: f64) -> Result<(), CsrError> {
        if column >= self.dim.ncols {
            return Err(CsrError::OutOfBoundsIndex {
                index: column,
                max: self.dim.ncols,
            });
        }
        if row >= self.dim.nrows {
            return Err(CsrError::OutOfBoundsIndex {
                index: row,
                max: self.dim.nrows,
            });
        }

        if self.keep_zeros || value != 0.0 {
            self.entries.push((column, row, value));
        }

        Ok(())
    }

    pub fn build(self) -> Result<CsrMatrix, CsrError> {
        let m = self.dim.nrows;
        let keep_zeros = self.keep_zeros;

        // Combine duplicates and drop zeros; sort by (row,col)
        let mut entries = self.entries;
        entries.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));

        let mut combined: Vec<(usize, usize, f64)> = Vec::with_capacity(entries.len());
        let mut last_row = usize::MAX;
        let mut last_col = usize::MAX;
        let mut acc = 0.0f64;
        for &(c, r, v) in &entries {
            if r == last_row && c == last_col {
                acc += v;
            } else {
                if last_row != usize::MAX && (keep_zeros || acc != 0.0) {
                    combined.push((last_col, last_row, acc));
                }
                last_row = r;
                last_col = c;
                acc = v;
            }
        }
        if last_row != usize::MAX && (keep_zeros || acc != 0.0) {
            combined.push((last_col, last_row, acc));
        }

        // Build CSR arrays with a counting pass then placement pass
        let mut row_pointers = vec![0usize; m + 1];
        for &(_c, r, _v) in &combined {
            row_pointers[r + 1] += 1;
        }
        for i in 0..m {
            row_pointers[i + 1] += row_pointers[i];
        }

        let nnz = combined.len();
        let mut column_indices = vec![0usize; nnz];
        let mut values = vec![0f64; nnz];
        let mut next = row_pointers.clone();
        for (c, r, v) in combined {
            let p = next[r];
            column_indices[p] = c;
            values[p] = v;
            next[r] += 1;
        }

        let a = CsrMatrix {
            dim: self.dim,
            row_pointers,
            column_indices,
            values,
        };
        debug_assert!(a.check_invariants().is_ok());
        Ok(a)
    }
}
