//! Edge-aware pre-median filter (spec §4.5): a single diamond-neighborhood
//! median pass applied to the green plane before the main interpolators run.
//!
//! The reference implementation gates a red/blue pre-median branch behind a
//! compile-time `#if 0` that is permanently disabled; red and blue planes are
//! therefore passed through unchanged here too (spec §3 "Supplemented
//! features").

use rayon::prelude::*;

use crate::cfa::CfaColor;
use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use ndarray::Array2;

/// The nine-tap green diamond: `{(-2,0),(-1,±1),(0,{-2,0,2}),(1,±1),(2,0)}`.
/// Index 4 is the center `(0,0)`.
const DIAMOND: [(i64, i64); 9] = [
    (-2, 0),
    (-1, -1),
    (-1, 1),
    (0, -2),
    (0, 0),
    (0, 2),
    (1, -1),
    (1, 1),
    (2, 0),
];

/// Run the green-plane pre-median pass `passes` times in place.
///
/// `color_at(row, col)` must return the CFA color of `green[[row, col]]`
/// (callers pass a closure over their [`crate::cfa::CfaPattern`]). Only
/// green-colored sites are touched; non-green sites act as sentinels and are
/// copied through unchanged, matching the original's sentinel-exclusion rule.
/// `threshold` gates which of the nine taps are treated as part of the local
/// neighborhood versus excluded as outliers (spec §4.5).
pub fn pre_median_green(
    green: &Array2<f32>,
    color_at: impl Fn(i64, i64) -> CfaColor + Sync,
    passes: u32,
    threshold: f32,
) -> Array2<f32> {
    let mut current = green.clone();
    for _ in 0..passes {
        current = pre_median_pass(&current, &color_at, threshold);
    }
    current
}

fn pre_median_pass(
    src: &Array2<f32>,
    color_at: &(impl Fn(i64, i64) -> CfaColor + Sync),
    threshold: f32,
) -> Array2<f32> {
    let (height, width) = src.dim();
    let parallel = height * width >= PARALLEL_PIXEL_THRESHOLD;

    let compute_row = |row: usize| -> Vec<f32> {
        (0..width)
            .map(|col| median_at(src, color_at, row, col, height, width, threshold))
            .collect()
    };

    let rows: Vec<Vec<f32>> = if parallel {
        (0..height).into_par_iter().map(compute_row).collect()
    } else {
        (0..height).map(compute_row).collect()
    };

    let mut out = Array2::<f32>::zeros((height, width));
    for (row, values) in rows.into_iter().enumerate() {
        for (col, v) in values.into_iter().enumerate() {
            out[[row, col]] = v;
        }
    }
    out
}

/// Clamped fetch: out-of-bounds diamond taps fall back to the center value,
/// matching the original's assumption that this only ever runs on interior
/// pixels while still being safe to call anywhere.
#[inline]
fn fetch(src: &Array2<f32>, row: i64, col: i64, height: usize, width: usize, center: f32) -> f32 {
    if row < 0 || col < 0 || row >= height as i64 || col >= width as i64 {
        center
    } else {
        src[[row as usize, col as usize]]
    }
}

#[inline]
fn median_at(
    src: &Array2<f32>,
    color_at: &(impl Fn(i64, i64) -> CfaColor + Sync),
    row: usize,
    col: usize,
    height: usize,
    width: usize,
    threshold: f32,
) -> f32 {
    if color_at(row as i64, col as i64) != CfaColor::Green {
        return src[[row, col]];
    }

    let center = src[[row, col]];
    const SENTINEL: f32 = 64.0;

    let mut med = [0.0f32; 9];
    let mut cnt = 0usize;
    for (k, (dy, dx)) in DIAMOND.iter().enumerate() {
        let v = fetch(src, row as i64 + dy, col as i64 + dx, height, width, center);
        if (v - center).abs() < threshold {
            med[k] = v;
            cnt += 1;
        } else {
            med[k] = v + SENTINEL;
        }
    }

    // The center always compares equal to itself (diff 0), so it is always
    // included; `cnt == 1` means every other tap was excluded, i.e. the
    // center is an outlier surrounded by a consistent neighborhood. The
    // sole included entry is then necessarily the center itself, so it is
    // returned directly rather than re-deriving it from the sort.
    if cnt == 1 {
        return center;
    }

    med.sort_by(|a, b| a.partial_cmp(b).unwrap());
    med[(cnt - 1) / 2]
}
