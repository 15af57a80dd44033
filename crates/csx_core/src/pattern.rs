//! Pattern descriptors, per spec.md §3 and §9.
//!
//! The source's macro-enumerated block types (`BLOCK_R1..BLOCK_R8`,
//! `BLOCK_C1..BLOCK_C8`) become two variants carrying the block dimension as
//! a plain integer (`PatternType::BlockRow(r)` / `BlockCol(c)`), per spec.md
//! §9's redesign note.

/// The stride between consecutive pattern id buckets, per spec.md §3.
pub const PATTERN_ID_OFFSET: i64 = 10_000;

/// A dense iteration-order tag. Determines which coordinate map (see
/// `crate::ir::transform`) turns this pattern's elements into a horizontal
/// run of constant delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternType {
    /// The irregular fallback: a run of non-zeros with no shared structure,
    /// carried as a delta-encoded list rather than a single pattern record.
    Delta,
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
    /// `r` consecutive rows, traversed in row-major block order.
    BlockRow(u8),
    /// `c` consecutive columns, traversed in column-major block order.
    BlockCol(u8),
}

impl PatternType {
    /// Stable small integer used both for scoring tie-breaks (§4.3, "ties
    /// are broken by type id") and as the high part of a pattern id.
    pub fn type_id(self) -> i64 {
        match self {
            PatternType::Delta => 0,
            PatternType::Horizontal => 1,
            PatternType::Vertical => 2,
            PatternType::Diagonal => 3,
            PatternType::AntiDiagonal => 4,
            PatternType::BlockRow(_) => 5,
            PatternType::BlockCol(_) => 6,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, PatternType::BlockRow(_) | PatternType::BlockCol(_))
    }

    /// All the non-delta types the statistics engine and encoder iterate
    /// over for a matrix with the given block dimensions (spec.md §4.2's
    /// "candidate encoding type").
    pub fn candidates(block_dims: &[u8]) -> Vec<PatternType> {
        let mut v = vec![
            PatternType::Horizontal,
            PatternType::Vertical,
            PatternType::Diagonal,
            PatternType::AntiDiagonal,
        ];
        for &d in block_dims {
            v.push(PatternType::BlockRow(d));
            v.push(PatternType::BlockCol(d));
        }
        v
    }
}

/// Immutable record `(type, size, delta[, other_dim])`, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternDescriptor {
    pub ty: PatternType,
    /// Element count of the pattern; >= 2 for real patterns.
    pub size: u32,
    /// Stride between consecutive elements in the pattern's natural order.
    pub delta: i64,
    /// Second block dimension; only meaningful for block patterns.
    pub other_dim: Option<u8>,
}

impl PatternDescriptor {
    pub fn linear(ty: PatternType, size: u32, delta: i64) -> Self {
        debug_assert!(!ty.is_block());
        Self {
            ty,
            size,
            delta,
            other_dim: None,
        }
    }

    pub fn block(ty: PatternType, size: u32, other_dim: u8) -> Self {
        debug_assert!(ty.is_block());
        Self {
            ty,
            size,
            delta: 1,
            other_dim: Some(other_dim),
        }
    }

    /// The `(type, delta or other_dim)` instantiation this descriptor was
    /// built from — the key the statistics engine groups by (spec.md §4.2).
    pub fn instantiation_param(&self) -> i64 {
        match self.ty {
            PatternType::BlockRow(_) | PatternType::BlockCol(_) => {
                self.other_dim.expect("block pattern without other_dim") as i64
            }
            _ => self.delta,
        }
    }

    /// `type * OFFSET + param`, per spec.md §3.
    pub fn pattern_id(&self) -> i64 {
        self.ty.type_id() * PATTERN_ID_OFFSET + self.instantiation_param()
    }
}

/// A dense integer identifying one `(type, param)` instantiation, assigned
/// in first-seen order by the CSX builder (spec.md §3, "Pattern id").
pub type PatternFlag = u8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_id_formula() {
        let d = PatternDescriptor::linear(PatternType::Horizontal, 8, 1);
        assert_eq!(d.pattern_id(), 1 * PATTERN_ID_OFFSET + 1);

        let b = PatternDescriptor::block(PatternType::BlockRow(2), 8, 4);
        assert_eq!(b.pattern_id(), 5 * PATTERN_ID_OFFSET + 4);
    }

    #[test]
    fn candidates_include_every_block_dim() {
        let c = PatternType::candidates(&[2, 3]);
        assert!(c.contains(&PatternType::BlockRow(2)));
        assert!(c.contains(&PatternType::BlockCol(3)));
        assert_eq!(c.len(), 4 + 2 * 2);
    }
}
