//! CFA descriptor & indexer (spec §4.1): answers "what color is at
//! `(row, col)`?" for both a packed 32-bit Bayer descriptor and a 6x6
//! X-Trans table.

use serde::{Deserialize, Serialize};

/// Color channel returned by [`CfaPattern::color_at`]. Bayer's duplicate
/// green code (3) is folded into `Green` before it ever reaches callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CfaColor {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl CfaColor {
    #[inline]
    fn from_code(code: u8) -> Self {
        match code & 3 {
            0 => CfaColor::Red,
            2 => CfaColor::Blue,
            _ => CfaColor::Green, // 1 and 3 (the second Bayer green) alias to Green.
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Named Bayer phases as packed 32-bit filter descriptors (spec §3, §4.1).
///
/// Bit layout: `((row&1)<<1 | col&1) * 2 ..+2` holds the 2-bit color code
/// for that 2x2-cell position, repeated across the 32 bits so the same
/// lookup works regardless of which row/col the caller indexes with.
pub mod filters {
    pub const RGGB: u32 = 0x9494_9494;
    pub const GRBG: u32 = 0x6161_6161;
    pub const GBRG: u32 = 0x4949_4949;
    pub const BGGR: u32 = 0x1616_1616;
}

/// The canonical Fuji X-Trans 6x6 color layout (0=R, 1=G, 2=B).
pub const XTRANS_CANONICAL: [[u8; 6]; 6] = [
    [1, 2, 1, 1, 0, 1],
    [1, 0, 1, 1, 2, 1],
    [0, 1, 2, 2, 1, 0],
    [2, 1, 0, 0, 1, 2],
    [1, 2, 1, 1, 0, 1],
    [1, 0, 1, 1, 2, 1],
];

/// CFA descriptor: a tagged union of Bayer (2x2) and X-Trans (6x6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CfaPattern {
    /// Packed 32-bit Bayer descriptor, see [`filters`].
    Bayer(u32),
    /// 6x6 color-code table, indexed with non-negative modular arithmetic.
    XTrans([[u8; 6]; 6]),
}

impl CfaPattern {
    /// The color at `(row, col)`, for any (including negative) coordinates.
    #[inline]
    pub fn color_at(&self, row: i64, col: i64) -> CfaColor {
        match self {
            CfaPattern::Bayer(filters) => fc_bayer(row, col, *filters),
            CfaPattern::XTrans(table) => fcol_xtrans(row, col, table),
        }
    }

    pub fn is_bayer(&self) -> bool {
        matches!(self, CfaPattern::Bayer(_))
    }

    pub fn is_xtrans(&self) -> bool {
        matches!(self, CfaPattern::XTrans(_))
    }

    /// CFA periodicity: 2 for Bayer, 6 for X-Trans (spec §3 invariant i).
    pub fn period(&self) -> usize {
        match self {
            CfaPattern::Bayer(_) => 2,
            CfaPattern::XTrans(_) => 6,
        }
    }
}

/// `fc_bayer(row, col, filters)` (spec §4.1): shift-and-mask on the packed
/// descriptor. `row`/`col` parity is taken via bitwise AND, which matches
/// two's-complement negative-number behavior the same way the original C
/// macro's `row&1` does.
#[inline]
pub fn fc_bayer(row: i64, col: i64, filters: u32) -> CfaColor {
    let r = (row & 1) as u32;
    let c = (col & 1) as u32;
    let idx = (r << 1) | c;
    let code = ((filters >> (idx * 2)) & 3) as u8;
    CfaColor::from_code(code)
}

/// `fcol(r,c) = xtrans[((r)+6)%6][((c)+6)%6]` (spec §4.1), using
/// non-negative modular arithmetic so negative arguments resolve correctly.
#[inline]
pub fn fcol_xtrans(row: i64, col: i64, xtrans: &[[u8; 6]; 6]) -> CfaColor {
    let r = row.rem_euclid(6) as usize;
    let c = col.rem_euclid(6) as usize;
    CfaColor::from_code(xtrans[r][c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rggb_phase() {
        let f = CfaPattern::Bayer(filters::RGGB);
        assert_eq!(f.color_at(0, 0), CfaColor::Red);
        assert_eq!(f.color_at(0, 1), CfaColor::Green);
        assert_eq!(f.color_at(1, 0), CfaColor::Green);
        assert_eq!(f.color_at(1, 1), CfaColor::Blue);
    }

    #[test]
    fn bggr_phase() {
        let f = CfaPattern::Bayer(filters::BGGR);
        assert_eq!(f.color_at(0, 0), CfaColor::Blue);
        assert_eq!(f.color_at(1, 1), CfaColor::Red);
    }

    #[test]
    fn negative_coordinates_match_positive_equivalents() {
        let f = CfaPattern::Bayer(filters::RGGB);
        // Bayer period is 2, so -2 aliases to 0.
        assert_eq!(f.color_at(-2, -2), f.color_at(0, 0));
        assert_eq!(f.color_at(-1, -1), f.color_at(1, 1));
    }

    #[test]
    fn xtrans_negative_modulo() {
        let mut table = [[0u8; 6]; 6];
        for (r, row) in table.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = ((r + c) % 3) as u8;
            }
        }
        let f = CfaPattern::XTrans(table);
        for r in 0..6 {
            for c in 0..6 {
                assert_eq!(
                    f.color_at(r as i64 - 6, c as i64 - 6),
                    f.color_at(r as i64, c as i64)
                );
            }
        }
    }

    #[test]
    fn periods() {
        assert_eq!(CfaPattern::Bayer(filters::RGGB).period(), 2);
        assert_eq!(CfaPattern::XTrans([[0; 6]; 6]).period(), 6);
    }
}
