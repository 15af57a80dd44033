//! Row rewriting: replace runs matching the chosen instantiation with a
//! single pattern record, per spec.md §4.3's "Rewriting a row".

use crate::config::RuntimeConfig;
use crate::ir::{Element, IrPartition};
use crate::pattern::{PatternDescriptor, PatternType};

fn block_dim_of(ty: PatternType) -> Option<usize> {
    match ty {
        PatternType::BlockRow(r) => Some(r as usize),
        PatternType::BlockCol(c) => Some(c as usize),
        _ => None,
    }
}

/// Rewrite every row of `partition` (assumed horizontal) under `ty`'s
/// iteration order, replacing constant-delta runs whose length is a
/// multiple of the block dimension (for block types) or matches `param`
/// (for linear types) with pattern records, then transform back to
/// horizontal.
pub fn rewrite_partition(partition: &IrPartition, ty: PatternType, param: i64, cfg: &RuntimeConfig) -> IrPartition {
    let reordered = partition.retransform(ty);
    let block_r = block_dim_of(ty);
    let max_unit = cfg.max_unit_size as usize;

    let mut rows = std::collections::BTreeMap::new();
    for (&row, elems) in &reordered.rows {
        rows.insert(row, rewrite_row(elems, ty, param, block_r, max_unit));
    }

    let rewritten = IrPartition {
        row_start: reordered.row_start,
        row_count: reordered.row_count,
        col_count: reordered.col_count,
        iteration: ty,
        rows,
    };
    rewritten.to_horizontal()
}

fn rewrite_row(
    elems: &[Element],
    ty: PatternType,
    param: i64,
    block_r: Option<usize>,
    max_unit: usize,
) -> Vec<Element> {
    // The chunk size a matching run gets split into: one fixed block
    // (r * other_dim elements) for block types, or `max_unit` for linear
    // types (spec.md §4.3's size-limit clause).
    let chunk = match block_r {
        Some(r) => r * param.max(0) as usize,
        None => max_unit.max(2),
    };

    let mut out = Vec::with_capacity(elems.len());
    let mut i = 0;
    while i < elems.len() {
        if elems[i].pattern.is_some() {
            out.push(elems[i].clone());
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let mut delta = None;
        while j < elems.len() && elems[j].pattern.is_none() {
            let d = elems[j].col as i64 - elems[j - 1].col as i64;
            match delta {
                None => delta = Some(d),
                Some(prev) if prev == d => {}
                _ => break,
            }
            j += 1;
        }
        let run_len = j - i;
        let expected_delta = if block_r.is_some() { 1 } else { param };
        let matches = chunk >= 2 && delta == Some(expected_delta) && run_len >= chunk;

        if matches {
            let mut k = i;
            while k + chunk <= j {
                let anchor = &elems[k];
                let desc = if block_r.is_some() {
                    PatternDescriptor::block(ty, chunk as u32, param as u8)
                } else {
                    PatternDescriptor::linear(ty, chunk as u32, param)
                };
                let values = elems[k..k + chunk].iter().map(|e| e.values[0]).collect();
                out.push(Element {
                    row: anchor.row,
                    col: anchor.col,
                    pattern: Some(desc),
                    values,
                });
                k += chunk;
            }
            for e in &elems[k..j] {
                out.push(e.clone());
            }
            i = j;
        } else {
            out.push(elems[i].clone());
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrPartition;
    use crate::matrix::builder::MatrixBuilder;

    #[test]
    fn rewrites_horizontal_run_into_single_pattern() {
        let mut b = MatrixBuilder::new(1, 8);
        for c in 0..8 {
            b.push(c, 0, 1.0).unwrap();
        }
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 1);
        let cfg = RuntimeConfig::default();

        let rewritten = rewrite_partition(&part, PatternType::Horizontal, 1, &cfg);
        let row = &rewritten.rows[&1];
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].pattern.unwrap().size, 8);
    }
}
