//! Window sampling for the statistics engine (spec.md §4.2's "Sampling").

use crate::config::{RuntimeConfig, Sampling, WindowSize};
use crate::ir::IrPartition;
use crate::pattern::PatternType;

use super::{StatsCollection, collect};

/// Resolve `preproc.window_size` to a concrete row count. `Auto` picks a
/// window covering roughly `nnz / nr_samples` non-zeros, clamped to at
/// least one row.
fn resolve_window_rows(partition: &IrPartition, cfg: &RuntimeConfig) -> usize {
    match cfg.window_size {
        WindowSize::Fixed(rows) => rows.max(1).min(partition.row_count.max(1)),
        WindowSize::Auto => {
            let samples = cfg.sampling_nr_samples.max(1);
            (partition.row_count / samples).max(1)
        }
    }
}

/// Compute statistics for `ty` over `partition`, either exhaustively or
/// over a uniform selection of windows scaled back up to the full
/// partition, per spec.md §4.2.
///
/// Sampling is skipped whenever it is disabled, the window size equals the
/// partition size, or the partition is too small to sample meaningfully.
pub fn collect_sampled(partition: &IrPartition, ty: PatternType, cfg: &RuntimeConfig) -> StatsCollection {
    if cfg.sampling == Sampling::Off || partition.row_count == 0 {
        return collect(partition, ty, cfg);
    }

    let horizontal = if partition.iteration == PatternType::Horizontal {
        partition.clone()
    } else {
        partition.to_horizontal()
    };

    let window_rows = resolve_window_rows(&horizontal, cfg);
    if window_rows >= horizontal.row_count {
        return collect(partition, ty, cfg);
    }

    let n_windows = horizontal.row_count.div_ceil(window_rows);
    let target_samples = cfg.sampling_nr_samples.max(1).min(n_windows);
    let stride = (n_windows as f64 / target_samples as f64).max(1.0);

    let mut out = StatsCollection::new();
    let mut sampled_nnz = 0usize;
    let mut windows_taken = 0usize;
    let mut next = 0.0f64;
    for w in 0..n_windows {
        if (w as f64) < next {
            continue;
        }
        next += stride;
        let lo = w * window_rows;
        let hi = (lo + window_rows).min(horizontal.row_count);
        let window = horizontal.window(lo, hi);
        let window_stats = collect(&window, ty, cfg);
        sampled_nnz += window.nnz();
        windows_taken += 1;
        for t in window_stats.types() {
            for (param, data) in window_stats.instantiations(t) {
                out.append(t, param, *data);
            }
        }
        if windows_taken >= target_samples {
            break;
        }
    }

    if sampled_nnz > 0 {
        // Scaling after summing every window is equivalent to scaling each
        // window before summing, since `data *= ratio` commutes with `+=`.
        let ratio = horizontal.nnz() as f64 / sampled_nnz as f64;
        out.scale_all(ratio);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::builder::MatrixBuilder;

    #[test]
    fn sampling_off_matches_exhaustive() {
        let mut b = MatrixBuilder::new(4, 8);
        for r in 0..4 {
            for c in 0..8 {
                b.push(c, r, 1.0).unwrap();
            }
        }
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 4);
        let cfg = RuntimeConfig::default();
        let exhaustive = collect(&part, PatternType::Horizontal, &cfg);
        let sampled = collect_sampled(&part, PatternType::Horizontal, &cfg);
        assert_eq!(exhaustive.totals().encoded_nz, sampled.totals().encoded_nz);
    }

    #[test]
    fn sampling_scales_totals_back_up() {
        let mut b = MatrixBuilder::new(8, 8);
        for r in 0..8 {
            for c in 0..8 {
                b.push(c, r, 1.0).unwrap();
            }
        }
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 8);
        let mut cfg = RuntimeConfig::default();
        cfg.sampling = Sampling::Portion;
        cfg.window_size = WindowSize::Fixed(2);
        cfg.sampling_nr_samples = 2;
        let sampled = collect_sampled(&part, PatternType::Horizontal, &cfg);
        assert!(sampled.totals().encoded_nz > 0);
    }
}
