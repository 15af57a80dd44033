//! Encoding selection & rewriting, per spec.md §4.3.

pub mod block_split;
pub mod rewrite;

use std::collections::{BTreeMap, HashSet};

use crate::config::RuntimeConfig;
use crate::ir::IrPartition;
use crate::pattern::PatternType;
use crate::stats::{self, StatsCollection};

/// `score = encoded_nz - n_patterns - lambda * n_deltas`, per spec.md §4.3.
/// `lambda` is 1 in "new heuristic" mode (the default) and 0 otherwise.
pub fn score(data: &stats::StatsData, lambda: f64) -> f64 {
    data.encoded_nz as f64 - data.n_patterns as f64 - lambda * data.n_deltas as f64
}

/// The winning `(type, instantiation param)` for one selection round, or
/// `None` when no positive score exists (encoding halts).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub ty: PatternType,
    pub param: i64,
    pub score: f64,
}

/// Pick the best-scoring instantiation across every candidate type not yet
/// in `ignore`. Ties are broken by type id (spec.md §4.3).
pub fn choose_type(
    all_stats: &BTreeMap<PatternType, StatsCollection>,
    ignore: &HashSet<PatternType>,
    lambda: f64,
) -> Option<Choice> {
    let mut best: Option<Choice> = None;
    for (&ty, collection) in all_stats {
        if ignore.contains(&ty) {
            continue;
        }
        for (param, data) in collection.instantiations(ty) {
            let s = score(data, lambda);
            let is_better = match &best {
                None => s > 0.0,
                Some(b) => s > b.score || (s == b.score && ty.type_id() < b.ty.type_id()),
            };
            if is_better && s > 0.0 {
                best = Some(Choice { ty, param, score: s });
            }
        }
    }
    best
}

/// Run the full statistics -> select -> rewrite loop until `choose_type`
/// returns none, per spec.md §4.3's "Termination".
pub fn encode_partition(partition: &IrPartition, cfg: &RuntimeConfig) -> IrPartition {
    let mut current = partition.to_horizontal();
    let mut ignore: HashSet<PatternType> = HashSet::new();
    let lambda = if cfg.new_heuristic { 1.0 } else { 0.0 };

    loop {
        let mut all_stats = stats::collect_all(&current, cfg);
        for collection in all_stats.values_mut() {
            if cfg.split_blocks {
                block_split::apply(collection, cfg);
            }
            collection.apply_cutoffs(current.nnz().max(1), cfg);
        }

        let Some(choice) = choose_type(&all_stats, &ignore, lambda) else {
            break;
        };

        log::debug!(
            "encode: selected type={:?} param={} score={:.2}",
            choice.ty,
            choice.param,
            choice.score
        );

        current = rewrite::rewrite_partition(&current, choice.ty, choice.param, cfg);
        ignore.insert(choice.ty);
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::builder::MatrixBuilder;

    #[test]
    fn horizontal_run_is_encoded_as_single_pattern() {
        let mut b = MatrixBuilder::new(1, 8);
        for c in 0..8 {
            b.push(c, 0, 1.0).unwrap();
        }
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 1);
        let cfg = RuntimeConfig::default();

        let encoded = encode_partition(&part, &cfg);
        let elems = &encoded.rows[&1];
        assert_eq!(elems.len(), 1);
        let pat = elems[0].pattern.unwrap();
        assert_eq!(pat.ty, PatternType::Horizontal);
        assert_eq!(pat.size, 8);
        assert_eq!(encoded.nnz(), 8);
    }

    #[test]
    fn legacy_mode_zeroes_the_delta_penalty() {
        let mut cfg = RuntimeConfig::default();
        cfg.new_heuristic = false;

        let mut b = MatrixBuilder::new(1, 8);
        for c in 0..8 {
            b.push(c, 0, 1.0).unwrap();
        }
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 1);

        let encoded = encode_partition(&part, &cfg);
        assert_eq!(encoded.nnz(), 8);

        let fragmented = stats::StatsData {
            encoded_nz: 10,
            n_patterns: 2,
            n_deltas: 50,
        };
        assert_eq!(score(&fragmented, 0.0), score(&fragmented, 0.0));
        assert!(score(&fragmented, 0.0) > score(&fragmented, 1.0));
    }

    #[test]
    fn score_rewards_coverage_and_penalizes_fragmentation() {
        let good = stats::StatsData {
            encoded_nz: 100,
            n_patterns: 2,
            n_deltas: 0,
        };
        let bad = stats::StatsData {
            encoded_nz: 10,
            n_patterns: 2,
            n_deltas: 50,
        };
        assert!(score(&good, 1.0) > score(&bad, 1.0));
    }
}
