//! CSX image layout, per spec.md §3 ("CSX image (per partition)") and §4.4.

pub mod ctl;
pub mod writer;

use crate::pattern::PatternFlag;

/// Which column-index representation `ctl` records use; one mode per image
/// (spec.md §4.4, §6's `matrix.full_colind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColIndexMode {
    /// Absolute 32-bit column, NUMA-friendly.
    Full,
    /// ULEB128 delta from the last emitted column.
    Compact,
}

/// Per-row lookup entry (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowInfo {
    pub ctl_offset: usize,
    pub values_offset: usize,
    pub span: usize,
}

/// Maps a first-seen-order flag to the pattern id it was assigned to
/// (spec.md §3, "Pattern id"). `id_map[K]` is a sentinel `-1`.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    pub ids: Vec<i64>,
}

impl IdMap {
    pub fn get(&self, flag: PatternFlag) -> Option<i64> {
        self.ids.get(flag as usize).copied()
    }

    /// Append a new pattern id and return the flag assigned to it,
    /// capped at 64 per `ctl`'s 6-bit flag field (see DESIGN.md).
    pub fn intern(&mut self, pattern_id: i64) -> Result<PatternFlag, crate::error::CsxError> {
        if let Some(flag) = self.ids.iter().position(|&id| id == pattern_id) {
            return Ok(flag as PatternFlag);
        }
        if self.ids.len() >= ctl::MAX_PATTERN_FLAGS {
            return Err(crate::error::CsxError::TooManyPatternTypes(self.ids.len() + 1));
        }
        self.ids.push(pattern_id);
        Ok((self.ids.len() - 1) as PatternFlag)
    }

    /// Serialised form: the interned ids followed by the `-1` sentinel
    /// (spec.md §3).
    pub fn to_table(&self) -> Vec<i64> {
        let mut table = self.ids.clone();
        table.push(-1);
        table
    }
}

/// One partition's encoded image (spec.md §3).
#[derive(Debug, Clone)]
pub struct CsxImage {
    pub nnz: usize,
    pub nrows: usize,
    pub ncols: usize,
    pub row_start: usize,
    pub col_mode: ColIndexMode,
    pub id_map: IdMap,
    pub values: Vec<f64>,
    pub ctl: Vec<u8>,
    pub rows_info: Vec<RowInfo>,
    /// Whether any `ctl` record in this partition carries a row-jump
    /// (`RJMP`) field, i.e. skips one or more all-zero rows. Recorded once
    /// while the image is built, not re-derived from `rows_info` — a row
    /// can legitimately have zero span and still be reached by a jump.
    pub row_jumps: bool,
}

impl CsxImage {
    pub fn ctl_size(&self) -> usize {
        self.ctl.len()
    }

    /// Checks the invariants of spec.md §8 that are local to one image.
    pub fn check_invariants(&self) -> bool {
        if self.rows_info.is_empty() {
            return self.nnz == 0;
        }
        if self.rows_info[0].ctl_offset != 0 {
            return false;
        }
        if self.rows_info.iter().any(|r| r.ctl_offset > self.ctl_size()) {
            return false;
        }
        true
    }
}
