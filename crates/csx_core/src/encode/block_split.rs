//! Block-split manipulator, per spec.md §4.3. Opt-in via
//! `matrix.split_blocks`.

use crate::config::RuntimeConfig;
use crate::pattern::PatternType;
use crate::stats::StatsCollection;

/// For block types only: find the largest instantiation whose non-zero
/// coverage still meets `min_coverage`, then decompose every strictly larger
/// instantiation into an integer multiple of that target plus a remainder,
/// redistributing `encoded_nz`/`n_patterns` accordingly. Separately split
/// any instantiation whose size would exceed `max_unit` into multiples of
/// `max_unit` plus a remainder.
pub fn apply(collection: &mut StatsCollection, cfg: &RuntimeConfig) {
    let block_types: Vec<PatternType> = collection
        .types()
        .filter(|t| matches!(t, PatternType::BlockRow(_) | PatternType::BlockCol(_)))
        .collect();

    for ty in block_types {
        split_for_type(collection, ty, cfg);
    }
}

fn split_for_type(collection: &mut StatsCollection, ty: PatternType, cfg: &RuntimeConfig) {
    let insts: Vec<(i64, crate::stats::StatsData)> = collection.instantiations(ty).map(|(p, d)| (p, *d)).collect();
    if insts.is_empty() {
        return;
    }

    let total_nnz: usize = insts.iter().map(|(_, d)| d.encoded_nz).sum::<usize>().max(1);

    let largest = insts
        .iter()
        .filter(|(_, d)| d.encoded_nz as f64 / total_nnz as f64 >= cfg.min_coverage)
        .max_by_key(|(p, _)| *p)
        .map(|(p, _)| *p);

    let Some(target) = largest else { return };
    let max_unit = cfg.max_unit_size as i64;
    let r = block_dim(ty);

    let mut rebuilt = StatsCollection::new();
    for (param, data) in insts {
        let unit = if param > target { target } else { param };
        let unit = unit.min(max_unit / r.max(1));
        if unit <= 0 || unit == param {
            rebuilt.append(ty, param, data);
            continue;
        }
        let unit_size = (unit * r) as usize;
        let total_size = (param * r) as usize;
        let n_full = data.n_patterns * (total_size / unit_size.max(1));
        let remainder_units = (total_size % unit_size.max(1)) * data.n_patterns;

        rebuilt.append(
            ty,
            unit,
            crate::stats::StatsData {
                encoded_nz: n_full * unit_size,
                n_patterns: n_full,
                n_deltas: 0,
            },
        );
        if remainder_units > 0 {
            rebuilt.append(
                crate::pattern::PatternType::Delta,
                0,
                crate::stats::StatsData {
                    encoded_nz: 0,
                    n_patterns: 0,
                    n_deltas: remainder_units,
                },
            );
        }
    }

    collection.clear_type(ty);
    for t in rebuilt.types() {
        for (p, d) in rebuilt.instantiations(t) {
            collection.append(t, p, *d);
        }
    }
}

fn block_dim(ty: PatternType) -> i64 {
    match ty {
        PatternType::BlockRow(r) => r as i64,
        PatternType::BlockCol(c) => c as i64,
        _ => 1,
    }
}
