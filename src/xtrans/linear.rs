//! X-Trans linear interpolation (spec §4.7): the fast, low-quality path.
//! Every missing channel at a pixel is a weighted average of same-color
//! samples in its immediate 3x3 neighborhood — weight 2 for the four
//! orthogonal (edge) neighbors, weight 1 for the four diagonal (corner)
//! neighbors; the native channel is copied verbatim.

use rayon::prelude::*;

use crate::border::interpolate_border;
use crate::cfa::{CfaColor, CfaPattern};
use crate::consts::{PARALLEL_PIXEL_THRESHOLD, XTRANS_BORDER};
use crate::image::{RawImage, WorkingImage};

/// `(dy, dx, weight)` for the eight immediate neighbors: weight 2 for the
/// orthogonal (edge) neighbors, weight 1 for the diagonal (corner) ones.
const NEIGHBORS: [(i64, i64, f32); 8] = [
    (-1, 0, 2.0),
    (1, 0, 2.0),
    (0, -1, 2.0),
    (0, 1, 2.0),
    (-1, -1, 1.0),
    (-1, 1, 1.0),
    (1, -1, 1.0),
    (1, 1, 1.0),
];

pub fn xtrans_linear(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64) -> WorkingImage {
    let height = raw.height();
    let width = raw.width();
    let mut out = WorkingImage::new(height, width);

    interpolate_border(&mut out, raw, cfa, roi_x, roi_y, XTRANS_BORDER);

    let border = XTRANS_BORDER;
    let parallel = height * width >= PARALLEL_PIXEL_THRESHOLD;

    let compute_row = |row: usize| -> Vec<Option<[f32; 3]>> {
        (0..width)
            .map(|col| {
                if row < border || col < border || row + border >= height || col + border >= width
                {
                    return None;
                }
                Some(pixel_at(raw, cfa, roi_x, roi_y, row, col))
            })
            .collect()
    };

    let rows: Vec<Vec<Option<[f32; 3]>>> = if parallel {
        (0..height).into_par_iter().map(compute_row).collect()
    } else {
        (0..height).map(compute_row).collect()
    };

    for (row, values) in rows.into_iter().enumerate() {
        for (col, v) in values.into_iter().enumerate() {
            if let Some(rgb) = v {
                out.set_pixel(row, col, rgb);
            }
        }
    }
    out
}

fn pixel_at(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64, row: usize, col: usize) -> [f32; 3] {
    let native = cfa.color_at(row as i64 + roi_y, col as i64 + roi_x);
    let mut rgb = [0.0f32; 3];
    rgb[native.index()] = raw.data[[row, col]];

    for color in [CfaColor::Red, CfaColor::Green, CfaColor::Blue] {
        if color == native {
            continue;
        }
        let mut weighted_sum = 0.0f64;
        let mut weight_total = 0.0f64;
        for (dy, dx, w) in NEIGHBORS {
            let y = row as i64 + dy;
            let x = col as i64 + dx;
            if y < 0 || x < 0 || y >= raw.height() as i64 || x >= raw.width() as i64 {
                continue;
            }
            if cfa.color_at(y + roi_y, x + roi_x) != color {
                continue;
            }
            weighted_sum += w as f64 * raw.data[[y as usize, x as usize]] as f64;
            weight_total += w as f64;
        }
        rgb[color.index()] = if weight_total > 0.0 {
            (weighted_sum / weight_total) as f32
        } else {
            rgb[native.index()]
        };
    }
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
        let out = xtrans_linear(&raw, &cfa, 0, 0);
        for row in 2..16 {
            for col in 2..16 {
                for v in out.pixel(row, col) {
                    assert!((v - 0.5).abs() < 1e-5 || v == 0.0);
                }
            }
        }
    }

    #[test]
    fn native_channel_is_exact() {
        let raw = RawImage::new(Array2::from_shape_fn((18, 18), |(r, c)| {
            ((r * 18 + c) % 13) as f32 / 13.0
        }));
        let cfa = CfaPattern::XTrans(XTRANS_CANONICAL);
        let out = xtrans_linear(&raw, &cfa, 0, 0);
        for row in 0..18 {
            for col in 0..18 {
                let native = cfa.color_at(row as i64, col as i64);
                let px = out.pixel(row, col);
                assert_eq!(px[native.index()], raw.data[[row, col]]);
            }
        }
    }
}
