//! The internal coordinate form (IR), per spec.md §2 stage 2 and §3.
//!
//! The source's `element -> coo-element -> row-element` inheritance chain
//! becomes one `Element` record whose pattern slot is `Option<PatternDescriptor>`,
//! per spec.md §9.

pub mod transform;

use std::collections::BTreeMap;

use crate::matrix::csr::CsrMatrix;
use crate::pattern::{PatternDescriptor, PatternType};

/// One non-zero, or one pattern instantiation anchored at `(row, col)`.
///
/// `values.len()` is `1` for an unpatterned element and `pattern.size` for a
/// patterned one (spec.md §3's "the associated value array holds the
/// pattern's payload").
#[derive(Debug, Clone)]
pub struct Element {
    pub row: usize,
    pub col: usize,
    pub pattern: Option<PatternDescriptor>,
    pub values: Vec<f64>,
}

impl Element {
    pub fn single(row: usize, col: usize, value: f64) -> Self {
        Self {
            row,
            col,
            pattern: None,
            values: vec![value],
        }
    }

    /// Non-zeros this record stands for.
    pub fn covered_nnz(&self) -> usize {
        match &self.pattern {
            Some(p) => p.size as usize,
            None => 1,
        }
    }
}

/// A row-contiguous slice of the matrix, materialised in one-based
/// coordinates, owned by a single worker (spec.md §3's "Partition").
///
/// `rows` is keyed by *logical* row under the partition's current
/// `iteration` order: when `iteration == PatternType::Horizontal` the keys
/// are native row indices (`1..=row_count`); under any other map they are
/// whatever `transform::forward` produces.
#[derive(Debug, Clone)]
pub struct IrPartition {
    /// Global row offset of this partition's native row 1.
    pub row_start: usize,
    /// Number of rows this partition owns, in native (row) order.
    pub row_count: usize,
    pub col_count: usize,
    pub iteration: PatternType,
    pub rows: BTreeMap<usize, Vec<Element>>,
}

impl IrPartition {
    /// Build a partition holding native rows `[row_lo, row_hi)` (0-based,
    /// half-open) of `csr`, with `row_start = row_lo`.
    pub fn from_csr_rows(csr: &CsrMatrix, row_lo: usize, row_hi: usize) -> Self {
        let mut rows = BTreeMap::new();
        for (local_idx, global_row) in (row_lo..row_hi).enumerate() {
            let (cols, vals) = csr.row(global_row);
            if cols.is_empty() {
                continue;
            }
            let elems = cols
                .iter()
                .zip(vals)
                .map(|(&c, &v)| Element::single(local_idx + 1, c + 1, v))
                .collect();
            rows.insert(local_idx + 1, elems);
        }
        IrPartition {
            row_start: row_lo,
            row_count: row_hi - row_lo,
            col_count: csr.dim.ncols,
            iteration: PatternType::Horizontal,
            rows,
        }
    }

    pub fn nnz(&self) -> usize {
        self.rows.values().flat_map(|r| r.iter()).map(Element::covered_nnz).sum()
    }

    pub fn n_records(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-express this partition under a different iteration order, by
    /// undoing the current map and applying the target one to every
    /// element's coordinates (spec.md §4.2's "transformed back to
    /// horizontal" / "transformed to that iteration order").
    ///
    /// Pattern payloads are carried through unchanged; only the anchor
    /// coordinate moves. This is only valid to call on partitions that
    /// contain no pattern records that span multiple native rows under a
    /// *different* target map than the one they were built under — the
    /// encoder always flattens patterns back to elements' native positions
    /// before re-transforming (see `encode::rewrite`).
    pub fn retransform(&self, target: PatternType) -> IrPartition {
        let mut rows: BTreeMap<usize, Vec<Element>> = BTreeMap::new();
        for elems in self.rows.values() {
            for e in elems {
                let (orig_row, orig_col) =
                    transform::inverse(e.row, e.col, self.iteration, self.row_count, self.col_count);
                let (new_row, new_col) =
                    transform::forward(orig_row, orig_col, target, self.row_count, self.col_count);
                let mut e2 = e.clone();
                e2.row = new_row;
                e2.col = new_col;
                rows.entry(new_row).or_default().push(e2);
            }
        }
        for v in rows.values_mut() {
            v.sort_by_key(|e| e.col);
        }
        IrPartition {
            row_start: self.row_start,
            row_count: self.row_count,
            col_count: self.col_count,
            iteration: target,
            rows,
        }
    }

    pub fn to_horizontal(&self) -> IrPartition {
        self.retransform(PatternType::Horizontal)
    }

    /// Reconstruct row pointers and check spec.md §8's invariants for a
    /// partition currently in row order.
    pub fn check_invariants(&self, original_nnz: usize) -> bool {
        if self.iteration != PatternType::Horizontal {
            return false;
        }
        self.nnz() == original_nnz
    }

    /// Sub-range view over `[lo, hi)` native rows, used for statistics
    /// sampling windows (spec.md §4.2). Windows never mutate the parent's
    /// storage; this is a cheap snapshot copy rather than a zero-copy view,
    /// which keeps the sampler free of lifetime plumbing at the cost of one
    /// clone per window — acceptable since windows only exist transiently
    /// during statistics gathering.
    pub fn window(&self, lo: usize, hi: usize) -> IrPartition {
        debug_assert_eq!(self.iteration, PatternType::Horizontal);
        let rows = self
            .rows
            .range(lo + 1..=hi)
            .map(|(&k, v)| (k - lo, v.clone()))
            .collect();
        IrPartition {
            row_start: self.row_start + lo,
            row_count: hi - lo,
            col_count: self.col_count,
            iteration: PatternType::Horizontal,
            rows,
        }
    }
}
