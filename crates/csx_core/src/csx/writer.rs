//! Builds a `CsxImage` by walking an encoded, horizontal `IrPartition`,
//! per spec.md §4.4.

use crate::config::RuntimeConfig;
use crate::error::CsxResult;
use crate::ir::IrPartition;
use crate::ir::transform;
use crate::pattern::PatternType;

use super::ctl::{CtlWriter, MAX_PATTERN_FLAGS};
use super::{ColIndexMode, CsxImage, IdMap, RowInfo};

const DELTA_PATTERN_ID: i64 = 0; // PatternType::Delta.type_id() * OFFSET + 0

/// How far (in rows) a pattern anchored at `anchor_row` reaches, by
/// stepping its transformed coordinate `size - 1` times and mapping each
/// step back to native space (spec.md §4.4's "Rows-info array").
fn pattern_span(ty: PatternType, anchor_row: usize, anchor_col: usize, delta: i64, size: u32, nrows: usize, ncols: usize) -> usize {
    let (tr, tc) = transform::forward(anchor_row, anchor_col, ty, nrows, ncols);
    let mut max_dist = 0usize;
    for k in 1..size as i64 {
        let stepped_col = tc as i64 + k * delta;
        if stepped_col < 1 {
            continue;
        }
        let (nr, _nc) = transform::inverse(tr, stepped_col as usize, ty, nrows, ncols);
        let dist = nr.abs_diff(anchor_row);
        max_dist = max_dist.max(dist);
    }
    max_dist
}

pub fn build_image(partition: &IrPartition, cfg: &RuntimeConfig) -> CsxResult<CsxImage> {
    debug_assert_eq!(partition.iteration, PatternType::Horizontal);

    let mode = if cfg.full_colind {
        ColIndexMode::Full
    } else {
        ColIndexMode::Compact
    };

    let mut writer = CtlWriter::new();
    let mut id_map = IdMap::default();
    let mut values = Vec::with_capacity(partition.nnz());
    let mut rows_info = Vec::with_capacity(partition.row_count);

    let mut last_emitted_row = 0usize; // 0 = "before row 1"
    let mut row_jumps = false;

    for local_row in 1..=partition.row_count {
        let ctl_offset_before = writer.bytes.len();
        let values_offset_before = values.len();
        let mut span = 0usize;

        if let Some(elems) = partition.rows.get(&local_row) {
            writer.reset_row_origin();
            let row_gap = local_row - last_emitted_row - 1;
            let mut first_in_row = true;

            let mut i = 0;
            while i < elems.len() {
                let e = &elems[i];
                if let Some(pat) = e.pattern {
                    let flag = id_map.intern(pat.pattern_id())?;
                    // Regular patterns share one stride across every
                    // element, recoverable at decode time from
                    // `flag -> id_map -> pattern_id -> delta`, so the
                    // record carries no per-element deltas (spec.md §4.4).
                    writer.write_record(
                        flag,
                        first_in_row,
                        if first_in_row && row_gap > 0 {
                            row_jumps = true;
                            Some(row_gap as u64)
                        } else {
                            None
                        },
                        pat.size as u8,
                        e.col as u64,
                        None,
                        mode,
                    );
                    values.extend_from_slice(&e.values);
                    span = span.max(pattern_span(
                        pat.ty,
                        e.row,
                        e.col,
                        pat.delta,
                        pat.size,
                        partition.row_count,
                        partition.col_count,
                    ));
                    i += 1;
                    first_in_row = false;
                } else {
                    // Group a contiguous run of unpatterned elements into
                    // one irregular delta record, chunked to max_unit_size.
                    let mut j = i + 1;
                    while j < elems.len() && elems[j].pattern.is_none() && j - i < cfg.max_unit_size as usize {
                        j += 1;
                    }
                    let chunk = &elems[i..j];
                    let deltas: Vec<u64> = chunk
                        .windows(2)
                        .map(|w| (w[1].col as i64 - w[0].col as i64).unsigned_abs())
                        .collect();
                    let flag = id_map.intern(DELTA_PATTERN_ID)?;
                    writer.write_record(
                        flag,
                        first_in_row,
                        if first_in_row && row_gap > 0 {
                            row_jumps = true;
                            Some(row_gap as u64)
                        } else {
                            None
                        },
                        chunk.len() as u8,
                        chunk[0].col as u64,
                        Some(&deltas),
                        mode,
                    );
                    values.extend(chunk.iter().map(|e| e.values[0]));
                    i = j;
                    first_in_row = false;
                }
            }
            last_emitted_row = local_row;
        }

        rows_info.push(RowInfo {
            ctl_offset: ctl_offset_before,
            values_offset: values_offset_before,
            span,
        });
    }

    if id_map.ids.len() > MAX_PATTERN_FLAGS {
        return Err(crate::error::CsxError::TooManyPatternTypes(id_map.ids.len()));
    }

    Ok(CsxImage {
        nnz: partition.nnz(),
        nrows: partition.row_count,
        ncols: partition.col_count,
        row_start: partition.row_start,
        col_mode: mode,
        id_map,
        values,
        ctl: writer.bytes,
        rows_info,
        row_jumps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_partition;
    use crate::matrix::builder::MatrixBuilder;

    #[test]
    fn horizontal_run_emits_one_record() {
        let mut b = MatrixBuilder::new(1, 8);
        for c in 0..8 {
            b.push(c, 0, 1.0).unwrap();
        }
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 1);
        let cfg = RuntimeConfig::default();
        let encoded = encode_partition(&part, &cfg);

        let image = build_image(&encoded, &cfg).unwrap();
        assert!(image.check_invariants());
        assert_eq!(image.values.len(), 8);
        assert_eq!(image.rows_info[0].ctl_offset, 0);
    }

    #[test]
    fn empty_partition_has_no_values() {
        let csr = MatrixBuilder::new(3, 3).build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 3);
        let cfg = RuntimeConfig::default();
        let image = build_image(&part, &cfg).unwrap();
        assert_eq!(image.values.len(), 0);
        assert_eq!(image.nnz, 0);
    }
}
