//! Code generation & dispatch, per spec.md §4.5.
//!
//! Rather than emitting a specialised source file or JIT stub per pattern
//! (either is acceptable per §4.5's "Dispatch" clause), this builds one
//! dispatch loop keyed by pattern flag and reuses the statistics engine's
//! coordinate maps (`crate::ir::transform`) to reconstruct each pattern
//! element's native position — the same map that discovered the pattern
//! also replays it, so there is exactly one implementation of "what does a
//! `(type, delta)` instantiation mean" in the crate.

pub mod templates;

use crate::csx::CsxImage;
use crate::csx::ctl::CtlReader;
use crate::pattern::{PATTERN_ID_OFFSET, PatternType};

/// A partition's generated SpMV function: `y <- alpha*A*x + beta*y` over
/// this partition's native row range, consuming `ctl`/`values` in lock
/// step (spec.md §4.5's contract).
pub struct PartitionKernel<'a> {
    image: &'a CsxImage,
}

impl<'a> PartitionKernel<'a> {
    pub fn new(image: &'a CsxImage) -> Self {
        Self { image }
    }

    /// `x`/`y` are full-length vectors; `y` is indexed at
    /// `image.row_start + local_row`.
    pub fn spmv(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
        let image = self.image;
        let mut acc = vec![0.0f64; image.nrows];
        for (i, slot) in acc.iter_mut().enumerate() {
            *slot = y[image.row_start + i] * beta;
        }

        let mut reader = CtlReader::new(&image.ctl);
        let mut value_pos = 0usize;
        let mut current_row = 0usize; // 0-based native row within the partition
        let mut started = false;

        while !reader.at_end() {
            let flag = reader.peek_flag();
            if reader.peek_is_new_row() {
                reader.reset_row_origin();
            }

            // The pattern flag resolves to a type before the record body is
            // read: only the irregular (delta) pattern's record carries a
            // trailing width tag/deltas array (spec.md §4.4), so that has
            // to be known ahead of `read_record`, not derived from it.
            let pattern_id = image.id_map.get(flag).unwrap_or(-1);
            let ty = type_of(pattern_id);
            let is_delta = matches!(ty, PatternType::Delta);
            let record = reader.read_record(image.col_mode, is_delta);

            if record.new_row {
                if !started {
                    current_row = record.row_jump.unwrap_or(0) as usize;
                    started = true;
                } else {
                    current_row += 1 + record.row_jump.unwrap_or(0) as usize;
                }
            }

            let anchor_row = current_row + 1; // one-based, matching ir::transform
            let anchor_col = record.col as usize;
            let size = record.size as u32;
            let values = &image.values[value_pos..value_pos + size as usize];

            if is_delta {
                templates::apply_delta(
                    anchor_row,
                    anchor_col,
                    &record.deltas,
                    image.nrows,
                    image.ncols,
                    x,
                    values,
                    alpha,
                    &mut acc,
                );
            } else {
                let delta = if ty.is_block() { 1 } else { param_of(pattern_id) };
                templates::apply(ty, anchor_row, anchor_col, delta, size, image.nrows, image.ncols, x, values, alpha, &mut acc);
            }

            value_pos += size as usize;
        }

        for (i, slot) in acc.into_iter().enumerate() {
            y[image.row_start + i] = slot;
        }
    }
}

fn type_of(pattern_id: i64) -> PatternType {
    let t = pattern_id.div_euclid(PATTERN_ID_OFFSET);
    match t {
        0 => PatternType::Delta,
        1 => PatternType::Horizontal,
        2 => PatternType::Vertical,
        3 => PatternType::Diagonal,
        4 => PatternType::AntiDiagonal,
        5 => PatternType::BlockRow(param_of(pattern_id) as u8),
        _ => PatternType::BlockCol(param_of(pattern_id) as u8),
    }
}

fn param_of(pattern_id: i64) -> i64 {
    pattern_id.rem_euclid(PATTERN_ID_OFFSET)
}
