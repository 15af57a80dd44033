//! Per-pattern inner loops, per spec.md §4.5's "Template set".
//!
//! Every template shares one shape: step the pattern's anchor `size` times
//! along its own natural (transformed) coordinate, map each step back to a
//! native `(row, col)` with `ir::transform::inverse`, and accumulate
//! `alpha * value * x[col]` into the partition-local `y` accumulator. This
//! is the same map the statistics engine used to discover the pattern in
//! the first place (`crate::ir::transform`), so the two can never disagree
//! about what a `(type, delta)` instantiation means.

use crate::ir::transform;
use crate::pattern::PatternType;

#[allow(clippy::too_many_arguments)]
pub fn apply(
    ty: PatternType,
    anchor_row: usize,
    anchor_col: usize,
    delta: i64,
    size: u32,
    nrows: usize,
    ncols: usize,
    x: &[f64],
    values: &[f64],
    alpha: f64,
    acc: &mut [f64],
) {
    let (tr, tc) = transform::forward(anchor_row, anchor_col, ty, nrows, ncols);
    for k in 0..size as i64 {
        let stepped_col = tc as i64 + k * delta;
        if stepped_col < 1 {
            continue;
        }
        let (native_row, native_col) = transform::inverse(tr, stepped_col as usize, ty, nrows, ncols);
        if native_row == 0 || native_row > nrows || native_col == 0 || native_col > ncols {
            continue;
        }
        acc[native_row - 1] += alpha * values[k as usize] * x[native_col - 1];
    }
}

/// The irregular (delta) template: unlike the regular patterns, consecutive
/// elements don't share one stride, so each step advances by its own
/// recorded delta instead of a constant `k * delta` (spec.md §4.4's
/// irregular records). `Delta`'s coordinate map is the identity, so this
/// walks native `(row, col)` directly rather than going through
/// `ir::transform`.
pub fn apply_delta(
    anchor_row: usize,
    anchor_col: usize,
    deltas: &[u64],
    nrows: usize,
    ncols: usize,
    x: &[f64],
    values: &[f64],
    alpha: f64,
    acc: &mut [f64],
) {
    if anchor_row == 0 || anchor_row > nrows {
        return;
    }
    let mut col = anchor_col;
    let mut accumulate = |col: usize, value: f64| {
        if col >= 1 && col <= ncols {
            acc[anchor_row - 1] += alpha * value * x[col - 1];
        }
    };
    accumulate(col, values[0]);
    for (k, &d) in deltas.iter().enumerate() {
        col += d as usize;
        accumulate(col, values[k + 1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_template_matches_plain_dot_product() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let values = vec![1.0, 1.0, 1.0, 1.0];
        let mut acc = vec![0.0; 1];
        apply(PatternType::Horizontal, 1, 1, 1, 4, 1, 4, &x, &values, 1.0, &mut acc);
        assert_eq!(acc[0], 10.0);
    }

    #[test]
    fn vertical_template_spreads_across_rows() {
        let x = vec![2.0];
        let values = vec![1.0, 1.0, 1.0];
        let mut acc = vec![0.0; 3];
        apply(PatternType::Vertical, 1, 1, 1, 3, 3, 1, &x, &values, 1.0, &mut acc);
        assert_eq!(acc, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn delta_template_walks_irregular_strides() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let values = vec![1.0, 1.0, 1.0];
        let mut acc = vec![0.0; 1];
        // anchor at col 1, then +2 -> col 3, then +3 -> col 6.
        apply_delta(1, 1, &[2, 3], 1, 6, &x, &values, 1.0, &mut acc);
        assert_eq!(acc[0], x[0] + x[2] + x[5]);
    }
}
