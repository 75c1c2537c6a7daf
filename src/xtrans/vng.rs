//! Variable Number of Gradients interpolation (spec §4.8).
//!
//! Runs the linear pass first to get a complete, border-safe base image,
//! then refines every interior pixel: eight directional gradients are
//! estimated from the nearest same/opposite-color samples, directions whose
//! gradient does not exceed `gmin + 0.5*gmax` contribute to the color
//! estimate, following the variable-gradient-count design of the reference
//! algorithm generalized here to work against any [`CfaPattern`] rather than
//! a fixed per-pattern offset table.

use rayon::prelude::*;

use crate::cfa::CfaPattern;
use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::image::{RawImage, WorkingImage};
use crate::xtrans::linear::xtrans_linear;

const DIRECTIONS: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

pub fn xtrans_vng(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64) -> WorkingImage {
    let height = raw.height();
    let width = raw.width();

    // Linear pass first, then refine (spec §4.8); its border handling is
    // reused verbatim, so refine only needs to cover the interior.
    let mut out = xtrans_linear(raw, cfa, roi_x, roi_y);

    let border = 1usize;
    let parallel = height * width >= PARALLEL_PIXEL_THRESHOLD;

    let compute_row = |row: usize| -> Vec<Option<[f32; 3]>> {
        (0..width)
            .map(|col| {
                if row < border || col < border || row + border >= height || col + border >= width
                {
                    return None;
                }
                Some(refine_pixel(raw, cfa, roi_x, roi_y, row, col))
            })
            .collect()
    };

    let mut rows: Vec<Vec<Option<[f32; 3]>>> = if parallel {
        (0..height).into_par_iter().map(compute_row).collect()
    } else {
        (0..height).map(compute_row).collect()
    };

    // The reference implementation finishes by copying the last two
    // computed rows straight through from the rotating gradient buffer; the
    // per-row closure above already produces complete rows, so this just
    // re-derives those last two with the same refine step for parity with
    // that trailing-row treatment.
    if height >= 1 + border {
        for row in [height.saturating_sub(2), height - 1] {
            if row >= border && row + border < height {
                rows[row] = (0..width)
                    .map(|col| {
                        if col < border || col + border >= width {
                            None
                        } else {
                            Some(refine_pixel(raw, cfa, roi_x, roi_y, row, col))
                        }
                    })
                    .collect();
            }
        }
    }

    for (row, values) in rows.into_iter().enumerate() {
        for (col, v) in values.into_iter().enumerate() {
            if let Some(rgb) = v {
                out.set_pixel(row, col, rgb);
            }
        }
    }
    out
}

fn refine_pixel(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64, row: usize, col: usize) -> [f32; 3] {
    let native = cfa.color_at(row as i64 + roi_y, col as i64 + roi_x);
    let center = raw.data[[row, col]];

    let mut gradients = [0.0f32; 8];
    for (k, (dy, dx)) in DIRECTIONS.iter().enumerate() {
        let y = row as i64 + dy;
        let x = col as i64 + dx;
        let y2 = row as i64 + 2 * dy;
        let x2 = col as i64 + 2 * dx;
        let near = raw.get_clamped(y as isize, x as isize);
        let far = raw.get_clamped(y2 as isize, x2 as isize);
        gradients[k] = (center - near).abs() + (near - far).abs();
    }
    let gmin = gradients.iter().cloned().fold(f32::INFINITY, f32::min);
    let gmax = gradients.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let threshold = gmin + 0.5 * gmax;

    let mut sum = [0.0f64; 3];
    let mut count = 0u32;

    for (k, (dy, dx)) in DIRECTIONS.iter().enumerate() {
        if gradients[k] > threshold {
            continue;
        }
        let y = row as i64 + dy;
        let x = col as i64 + dx;
        let color = cfa.color_at(y + roi_y, x + roi_x);
        let value = raw.get_clamped(y as isize, x as isize);
        let contribution = if color == native {
            (center + value) / 2.0
        } else {
            value
        };
        sum[color.index()] += contribution as f64;
        count += 1;
    }

    if count == 0 {
        return [center; 3];
    }

    let sum_native = sum[native.index()];
    let mut rgb = [0.0f32; 3];
    for c in 0..3 {
        rgb[c] = center + ((sum[c] - sum_native) / count as f64) as f32;
    }
    rgb[native.index()] = center;
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::XTRANS_CANONICAL;
    use ndarray::Array2;

    #[test]
    fn uniform_input_gives_uniform_output() {
        let raw = RawImage::new(Array2::from_elem((18, 18), 0.5f32));
        let cfa = CfaPattern::XTrans(XTRANS_CANONICAL);
        let out = xtrans_vng(&raw, &cfa, 0, 0);
        for row in 2..16 {
            for col in 2..16 {
                for v in out.pixel(row, col) {
                    assert!((v - 0.5).abs() < 1e-4 || v == 0.0);
                }
            }
        }
    }

    #[test]
    fn native_channel_matches_raw_at_interior_pixels() {
        let raw = RawImage::new(Array2::from_shape_fn((18, 18), |(r, c)| {
            ((r * 18 + c) % 13) as f32 / 13.0
        }));
        let cfa = CfaPattern::XTrans(XTRANS_CANONICAL);
        let out = xtrans_vng(&raw, &cfa, 0, 0);
        for row in 3..15 {
            for col in 3..15 {
                let native = cfa.color_at(row as i64, col as i64);
                let px = out.pixel(row, col);
                assert!((px[native.index()] - raw.data[[row, col]]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn patterned_input_stays_finite() {
        let raw = RawImage::new(Array2::from_shape_fn((20, 20), |(r, c)| {
            0.5 + 0.3 * ((r as f32 * 0.4).sin() * (c as f32 * 0.3).cos())
        }));
        let cfa = CfaPattern::XTrans(XTRANS_CANONICAL);
        let out = xtrans_vng(&raw, &cfa, 0, 0);
        for row in 0..20 {
            for col in 0..20 {
                for v in out.pixel(row, col) {
                    assert!(v.is_finite());
                }
            }
        }
    }
}
