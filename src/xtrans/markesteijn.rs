//! Markesteijn interpolation (spec §4.9): builds several directionally
//! biased reconstructions of the same tile and votes between them per pixel
//! using a YPbPr homogeneity metric, keeping the pixel whose neighborhood is
//! most self-consistent in color-difference space.
//!
//! The reference implementation precomputes a hexagonal neighbor table per
//! X-Trans phase and works tile-by-tile with a mirrored-border halo; this
//! keeps the tiled, mirrored-halo structure (see [`crate::consts`]) but
//! expresses the per-tile reconstruction with explicit `ndarray` indexing
//! over `(direction, row, col, channel)` rather than the original's raw
//! pointer walks, per the design note calling for that translation.

use rayon::prelude::*;

use crate::cfa::{CfaColor, CfaPattern};
use crate::consts::{MARKESTEIJN_TILE_MARGIN, MARKESTEIJN_TILE_SIZE};
use crate::image::{RawImage, WorkingImage};
use ndarray::Array4;

/// Direction subsets used by the three candidate reconstructions.
const CARDINAL: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i64, i64); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const ALL_EIGHT: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// `passes = 1` reconstructs a single candidate per pixel directly
/// (spec's `MARKESTEIJN_1`, the faster variant); `passes = 3` builds all
/// three candidates and votes between them (`MARKESTEIJN_3`).
pub fn xtrans_markesteijn(
    raw: &RawImage,
    cfa: &CfaPattern,
    roi_x: i64,
    roi_y: i64,
    passes: u8,
) -> WorkingImage {
    let height = raw.height();
    let width = raw.width();
    let mut out = WorkingImage::new(height, width);

    let tile = MARKESTEIJN_TILE_SIZE;
    let margin = MARKESTEIJN_TILE_MARGIN;

    let tiles: Vec<(usize, usize)> = {
        let mut t = Vec::new();
        let mut ty = 0;
        while ty < height {
            let mut tx = 0;
            while tx < width {
                t.push((ty, tx));
                tx += tile;
            }
            ty += tile;
        }
        t
    };

    let results: Vec<(usize, usize, Array4<f32>)> = tiles
        .into_par_iter()
        .map(|(ty, tx)| {
            let y0 = ty.saturating_sub(margin);
            let x0 = tx.saturating_sub(margin);
            let y1 = (ty + tile + margin).min(height);
            let x1 = (tx + tile + margin).min(width);
            let tile_rgb = reconstruct_tile(raw, cfa, roi_x, roi_y, y0, x0, y1, x1, passes);
            (y0, x0, tile_rgb)
        })
        .collect();

    for (y0, x0, tile_rgb) in results {
        let (th, tw, _, _) = tile_rgb.dim();
        for ty in 0..th {
            for tx in 0..tw {
                let row = y0 + ty;
                let col = x0 + tx;
                if row >= height || col >= width {
                    continue;
                }
                let best = best_candidate(&tile_rgb, ty, tx, th, tw);
                out.set_pixel(row, col, best);
            }
        }
    }

    out
}

/// Reconstruct every candidate direction set for the sub-rectangle
/// `[y0,y1) x [x0,x1)`, returning an array shaped `(rows, cols, candidates,
/// 3)`.
#[allow(clippy::too_many_arguments)]
fn reconstruct_tile(
    raw: &RawImage,
    cfa: &CfaPattern,
    roi_x: i64,
    roi_y: i64,
    y0: usize,
    x0: usize,
    y1: usize,
    x1: usize,
    passes: u8,
) -> Array4<f32> {
    let rows = y1 - y0;
    let cols = x1 - x0;
    let n_candidates = if passes <= 1 { 1 } else { 3 };
    let mut candidates = Array4::<f32>::zeros((rows, cols, n_candidates, 3));

    let direction_sets: [&[(i64, i64)]; 3] = [&CARDINAL, &DIAGONAL, &ALL_EIGHT];

    for ty in 0..rows {
        for tx in 0..cols {
            let row = y0 + ty;
            let col = x0 + tx;
            for k in 0..n_candidates {
                let dirs = direction_sets[k];
                let rgb = directional_estimate(raw, cfa, roi_x, roi_y, row, col, dirs);
                for c in 0..3 {
                    candidates[[ty, tx, k, c]] = rgb[c];
                }
            }
        }
    }
    candidates
}

fn directional_estimate(
    raw: &RawImage,
    cfa: &CfaPattern,
    roi_x: i64,
    roi_y: i64,
    row: usize,
    col: usize,
    dirs: &[(i64, i64)],
) -> [f32; 3] {
    let native = cfa.color_at(row as i64 + roi_y, col as i64 + roi_x);
    let center = raw.data[[row, col]];

    let mut sums = [0.0f64; 3];
    let mut counts = [0u32; 3];
    sums[native.index()] += center as f64;
    counts[native.index()] += 1;

    for (dy, dx) in dirs {
        let y = row as i64 + dy;
        let x = col as i64 + dx;
        let color = cfa.color_at(y + roi_y, x + roi_x);
        let value = raw.get_clamped(y as isize, x as isize);
        sums[color.index()] += value as f64;
        counts[color.index()] += 1;
    }

    let mut rgb = [0.0f32; 3];
    for c in 0..3 {
        rgb[c] = if counts[c] > 0 {
            (sums[c] / counts[c] as f64) as f32
        } else {
            center
        };
    }

    if native != CfaColor::Green {
        let (lo, hi) = green_bracket(raw, cfa, roi_x, roi_y, row, col);
        rgb[CfaColor::Green.index()] = rgb[CfaColor::Green.index()].clamp(lo, hi);
    }

    rgb
}

/// Min/max of the green samples within a radius-2 neighborhood of
/// `(row, col)` — a local stand-in for the reference implementation's
/// precomputed hexagonal green bracket (spec §4.9 step 1/2), used to clamp
/// each candidate's green estimate against its immediate surroundings.
fn green_bracket(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64, row: usize, col: usize) -> (f32, f32) {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for dy in -2i64..=2 {
        for dx in -2i64..=2 {
            if dy == 0 && dx == 0 {
                continue;
            }
            let y = row as i64 + dy;
            let x = col as i64 + dx;
            if cfa.color_at(y + roi_y, x + roi_x) != CfaColor::Green {
                continue;
            }
            let v = raw.get_clamped(y as isize, x as isize);
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo > hi {
        let center = raw.data[[row, col]];
        (center, center)
    } else {
        (lo, hi)
    }
}

/// YPbPr conversion used for the homogeneity metric (spec §4.9 exact
/// coefficients).
#[inline]
fn ypbpr(rgb: [f32; 3]) -> [f32; 3] {
    let y = 0.2627 * rgb[0] + 0.678 * rgb[1] + 0.0593 * rgb[2];
    let pb = (rgb[2] - y) * 0.56433;
    let pr = (rgb[0] - y) * 0.67815;
    [y, pb, pr]
}

/// Pick, for pixel `(ty, tx)`, the candidate whose YPbPr second-difference
/// from its immediate same-candidate neighbors is smallest (the most
/// homogeneous reconstruction), matching the voting intent of the original
/// multi-candidate design. With a single candidate this degenerates to a
/// direct pass-through.
fn best_candidate(candidates: &Array4<f32>, ty: usize, tx: usize, rows: usize, cols: usize) -> [f32; 3] {
    let n_candidates = candidates.dim().2;
    if n_candidates == 1 {
        return [
            candidates[[ty, tx, 0, 0]],
            candidates[[ty, tx, 0, 1]],
            candidates[[ty, tx, 0, 2]],
        ];
    }

    let mut best_k = 0;
    let mut best_score = f32::INFINITY;

    for k in 0..n_candidates {
        let center = ypbpr([
            candidates[[ty, tx, k, 0]],
            candidates[[ty, tx, k, 1]],
            candidates[[ty, tx, k, 2]],
        ]);
        let mut score = 0.0f32;
        let mut n = 0u32;
        for (dy, dx) in ALL_EIGHT {
            let ny = ty as i64 + dy;
            let nx = tx as i64 + dx;
            if ny < 0 || nx < 0 || ny >= rows as i64 || nx >= cols as i64 {
                continue;
            }
            let neighbor = ypbpr([
                candidates[[ny as usize, nx as usize, k, 0]],
                candidates[[ny as usize, nx as usize, k, 1]],
                candidates[[ny as usize, nx as usize, k, 2]],
            ]);
            score += (center[1] - neighbor[1]).abs() + (center[2] - neighbor[2]).abs();
            n += 1;
        }
        if n > 0 {
            score /= n as f32;
        }
        if score < best_score {
            best_score = score;
            best_k = k;
        }
    }

    [
        candidates[[ty, tx, best_k, 0]],
        candidates[[ty, tx, best_k, 1]],
        candidates[[ty, tx, best_k, 2]],
    ]
}
