//! Partitioner, per spec.md §4.1.

use crate::error::{CsxError, CsxResult};
use crate::matrix::csr::CsrMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionBounds {
    pub row_start: usize,
    pub row_count: usize,
}

/// Split `csr` row-contiguously into `p` partitions balanced by non-zero
/// count, closing a partition once its running load exceeds
/// `ceil(nnz/p)`, unless doing so would leave the final partition empty.
pub fn partition(csr: &CsrMatrix, p: usize) -> CsxResult<Vec<PartitionBounds>> {
    csr.check_invariants()?;
    if p == 0 {
        return Err(CsxError::InputMatrixInvalid("partition count must be >= 1".into()));
    }

    let nrows = csr.dim.nrows;
    let nnz = csr.nnz();

    if nnz == 0 {
        return Ok(even_split(nrows, p));
    }

    let ideal = nnz.div_ceil(p);
    let mut bounds = Vec::with_capacity(p);
    let mut row_start = 0usize;
    let mut running = 0usize;
    let mut remaining_partitions = p;

    for row in 0..nrows {
        running += csr.row(row).0.len();
        let rows_left_after = nrows - (row + 1);
        let would_empty_final = remaining_partitions == 1 && row + 1 < nrows;

        if running >= ideal && remaining_partitions > 1 && !would_empty_final {
            bounds.push(PartitionBounds {
                row_start,
                row_count: row + 1 - row_start,
            });
            row_start = row + 1;
            running = 0;
            remaining_partitions -= 1;
            let _ = rows_left_after;
        }
    }
    bounds.push(PartitionBounds {
        row_start,
        row_count: nrows - row_start,
    });

    // Any partitions past the number of rows available are emitted empty,
    // anchored at the end, so callers always get exactly `p` partitions.
    while bounds.len() < p {
        bounds.push(PartitionBounds {
            row_start: nrows,
            row_count: 0,
        });
    }

    Ok(bounds)
}

fn even_split(nrows: usize, p: usize) -> Vec<PartitionBounds> {
    let base = nrows / p;
    let extra = nrows % p;
    let mut bounds = Vec::with_capacity(p);
    let mut row_start = 0;
    for i in 0..p {
        let count = base + usize::from(i < extra);
        bounds.push(PartitionBounds {
            row_start,
            row_count: count,
        });
        row_start += count;
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::builder::MatrixBuilder;

    #[test]
    fn balances_partitions_by_nnz() {
        let mut b = MatrixBuilder::new(4, 4);
        b.push(0, 0, 1.0).unwrap();
        b.push(1, 0, 1.0).unwrap();
        b.push(0, 1, 1.0).unwrap();
        b.push(0, 2, 1.0).unwrap();
        b.push(0, 3, 1.0).unwrap();
        let csr = b.build().unwrap();

        let bounds = partition(&csr, 2).unwrap();
        assert_eq!(bounds.len(), 2);
        let total: usize = bounds.iter().map(|b| b.row_count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn empty_matrix_yields_p_empty_partitions() {
        let csr = MatrixBuilder::new(0, 0).build().unwrap();
        let bounds = partition(&csr, 3).unwrap();
        assert_eq!(bounds.len(), 3);
        assert!(bounds.iter().all(|b| b.row_count == 0));
    }

    #[test]
    fn never_splits_a_row_across_partitions() {
        let mut b = MatrixBuilder::new(5, 1);
        for r in 0..5 {
            b.push(0, r, 1.0).unwrap();
        }
        let csr = b.build().unwrap();
        let bounds = partition(&csr, 3).unwrap();
        let mut covered = 0;
        for pb in &bounds {
            assert_eq!(pb.row_start, covered);
            covered += pb.row_count;
        }
        assert_eq!(covered, 5);
    }
}
