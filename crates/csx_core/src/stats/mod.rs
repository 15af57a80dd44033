//! Statistics engine, per spec.md §4.2.
//!
//! Deterministic and thread-scheduling-independent: given the same
//! `IrPartition` and candidate type, `collect` always returns the same
//! `StatsCollection`. No hidden global state.

pub mod sampler;

use std::collections::BTreeMap;

use crate::config::RuntimeConfig;
use crate::ir::IrPartition;
use crate::ir::transform;
use crate::pattern::PatternType;

/// Per-instantiation counters, per spec.md §3.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsData {
    pub encoded_nz: usize,
    pub n_patterns: usize,
    pub n_deltas: usize,
}

impl StatsData {
    pub fn scale(&mut self, factor: f64) {
        self.encoded_nz = (self.encoded_nz as f64 * factor).round() as usize;
        self.n_patterns = (self.n_patterns as f64 * factor).round() as usize;
        self.n_deltas = (self.n_deltas as f64 * factor).round() as usize;
    }
}

/// A two-level collection: type -> (instantiation param -> StatsData),
/// with recomputed global totals after any manipulation (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct StatsCollection {
    by_type: BTreeMap<PatternType, BTreeMap<i64, StatsData>>,
    totals: StatsData,
}

impl StatsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, ty: PatternType, param: i64, data: StatsData) {
        let entry = self.by_type.entry(ty).or_default().entry(param).or_default();
        entry.encoded_nz += data.encoded_nz;
        entry.n_patterns += data.n_patterns;
        entry.n_deltas += data.n_deltas;
        self.recompute_totals();
    }

    pub fn instantiations(&self, ty: PatternType) -> impl Iterator<Item = (i64, &StatsData)> {
        self.by_type.get(&ty).into_iter().flat_map(|m| m.iter().map(|(&k, v)| (k, v)))
    }

    pub fn types(&self) -> impl Iterator<Item = PatternType> + '_ {
        self.by_type.keys().copied()
    }

    /// Drop every instantiation recorded for `ty`, used by the block-split
    /// manipulator to replace a type's entries wholesale.
    pub fn clear_type(&mut self, ty: PatternType) {
        self.by_type.remove(&ty);
        self.recompute_totals();
    }

    pub fn scale_all(&mut self, factor: f64) {
        for insts in self.by_type.values_mut() {
            for data in insts.values_mut() {
                data.scale(factor);
            }
        }
        self.recompute_totals();
    }

    /// Drop instantiations whose coverage (as a fraction of `partition_nnz`)
    /// falls below `min_coverage`, or whose `size` (derived from `param` for
    /// linear types, or looked up directly for block types) falls outside
    /// `[min_unit, max_unit]`.
    pub fn apply_cutoffs(&mut self, partition_nnz: usize, cfg: &RuntimeConfig) {
        if partition_nnz == 0 {
            return;
        }
        for insts in self.by_type.values_mut() {
            insts.retain(|_, data| {
                let coverage = data.encoded_nz as f64 / partition_nnz as f64;
                coverage >= cfg.min_coverage
            });
        }
        self.by_type.retain(|_, insts| !insts.is_empty());
        self.recompute_totals();
    }

    fn recompute_totals(&mut self) {
        self.totals = StatsData::default();
        for insts in self.by_type.values() {
            for d in insts.values() {
                self.totals.encoded_nz += d.encoded_nz;
                self.totals.n_patterns += d.n_patterns;
                self.totals.n_deltas += d.n_deltas;
            }
        }
    }

    pub fn totals(&self) -> StatsData {
        self.totals
    }
}

/// Run-length scan of `partition`'s rows under `ty`'s iteration order,
/// tallying `encoded_nz`/`n_patterns` per instantiation. Patterns already
/// present in an element (from a previous encoding pass) are skipped: the
/// encoder never encodes across an existing pattern boundary.
pub fn collect(partition: &IrPartition, ty: PatternType, cfg: &RuntimeConfig) -> StatsCollection {
    let mut out = StatsCollection::new();
    let reordered = if ty == partition.iteration {
        partition.clone()
    } else {
        partition.retransform(ty)
    };

    for elems in reordered.rows.values() {
        let mut run_start = 0usize;
        while run_start < elems.len() {
            if elems[run_start].pattern.is_some() {
                run_start += 1;
                continue;
            }
            let mut run_end = run_start + 1;
            let mut delta = None;
            while run_end < elems.len() && elems[run_end].pattern.is_none() {
                let d = elems[run_end].col as i64 - elems[run_end - 1].col as i64;
                match delta {
                    None => delta = Some(d),
                    Some(prev) if prev == d => {}
                    _ => break,
                }
                run_end += 1;
            }
            let run_len = run_end - run_start;
            if run_len >= cfg.min_unit_size as usize {
                let d = delta.unwrap_or(1);
                let block_r = block_dim_of(ty);
                let mut capped_len = run_len.min(cfg.max_unit_size as usize);
                if let Some(r) = block_r {
                    // keep the capped unit a whole number of block rows so
                    // other_dim = capped_len / r divides evenly.
                    capped_len -= capped_len % r;
                    if capped_len == 0 {
                        run_start = run_end;
                        continue;
                    }
                }
                let n_full = run_len / capped_len;
                let remainder = run_len % capped_len;
                let param = match block_r {
                    Some(r) => (capped_len / r) as i64,
                    None => d,
                };
                let mut data = StatsData {
                    encoded_nz: n_full * capped_len,
                    n_patterns: n_full,
                    n_deltas: 0,
                };
                out.append(ty, param, data);
                if remainder > 0 {
                    data = StatsData {
                        encoded_nz: 0,
                        n_patterns: 0,
                        n_deltas: remainder,
                    };
                    out.append(PatternType::Delta, 0, data);
                }
            } else {
                out.append(
                    PatternType::Delta,
                    0,
                    StatsData {
                        encoded_nz: 0,
                        n_patterns: 0,
                        n_deltas: run_len,
                    },
                );
            }
            run_start = run_end;
        }
    }
    out
}

/// Build a `StatsCollection` for every candidate type in `cfg`, optionally
/// through the sampler (spec.md §4.2's "Sampling").
pub fn collect_all(partition: &IrPartition, cfg: &RuntimeConfig) -> BTreeMap<PatternType, StatsCollection> {
    let mut out = BTreeMap::new();
    for ty in PatternType::candidates(&cfg.block_dims) {
        if !cfg.xform.allows(type_name(ty)) {
            continue;
        }
        let collection = sampler::collect_sampled(partition, ty, cfg);
        out.insert(ty, collection);
    }
    out
}

fn block_dim_of(ty: PatternType) -> Option<usize> {
    match ty {
        PatternType::BlockRow(r) => Some(r as usize),
        PatternType::BlockCol(c) => Some(c as usize),
        _ => None,
    }
}

fn type_name(ty: PatternType) -> &'static str {
    match ty {
        PatternType::Delta => "delta",
        PatternType::Horizontal => "horizontal",
        PatternType::Vertical => "vertical",
        PatternType::Diagonal => "diagonal",
        PatternType::AntiDiagonal => "anti_diagonal",
        PatternType::BlockRow(_) => "block_row",
        PatternType::BlockCol(_) => "block_col",
    }
}

/// Re-express one element's native-coordinate position under `ty`, used by
/// the rewriter to compute run deltas without re-transforming the whole
/// partition (spec.md §4.3).
pub fn coord_under(row: usize, col: usize, ty: PatternType, nrows: usize, ncols: usize) -> (usize, usize) {
    transform::forward(row, col, ty, nrows, ncols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::builder::MatrixBuilder;

    fn horizontal_run_partition() -> IrPartition {
        let mut b = MatrixBuilder::new(1, 8);
        for c in 0..8 {
            b.push(c, 0, 1.0).unwrap();
        }
        let csr = b.build().unwrap();
        IrPartition::from_csr_rows(&csr, 0, 1)
    }

    #[test]
    fn horizontal_run_is_counted_as_one_pattern() {
        let part = horizontal_run_partition();
        let cfg = RuntimeConfig::default();
        let stats = collect(&part, PatternType::Horizontal, &cfg);
        let totals = stats.totals();
        assert_eq!(totals.encoded_nz, 8);
        assert_eq!(totals.n_patterns, 1);
    }

    #[test]
    fn short_run_is_not_counted() {
        let mut b = MatrixBuilder::new(1, 8);
        b.push(0, 0, 1.0).unwrap();
        b.push(1, 0, 1.0).unwrap();
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 1);
        let cfg = RuntimeConfig::default();
        let stats = collect(&part, PatternType::Horizontal, &cfg);
        assert_eq!(stats.totals().n_patterns, 0);
        assert_eq!(stats.totals().n_deltas, 2);
    }
}
