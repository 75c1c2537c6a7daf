//! Fused demosaic+downscale fast paths (spec §2): used when the caller's
//! requested output scale is small enough that full-resolution interpolation
//! would be wasted work. Bayer halves the linear size by averaging each 2x2
//! CFA cell into one RGB triple; X-Trans thirds it by averaging each 6x6
//! cell's three color planes independently over the 12 samples per color
//! each cell contains.

use rayon::prelude::*;

use crate::cfa::{CfaColor, CfaPattern};
use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::image::{RawImage, WorkingImage};

/// Half-size Bayer downscale: each output pixel is the 2x2 CFA cell's R, G
/// (averaged over both green sites), and B.
pub fn half_size_bayer(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64) -> WorkingImage {
    assert!(cfa.is_bayer(), "half_size_bayer requires a Bayer pattern");
    let in_h = raw.height();
    let in_w = raw.width();
    let out_h = in_h / 2;
    let out_w = in_w / 2;
    let parallel = out_h * out_w >= PARALLEL_PIXEL_THRESHOLD;

    let compute_row = |out_row: usize| -> Vec<[f32; 3]> {
        let row0 = out_row * 2;
        (0..out_w)
            .map(|out_col| {
                let col0 = out_col * 2;
                let mut sum = [0.0f64; 3];
                let mut count = [0u32; 3];
                for dy in 0..2usize {
                    for dx in 0..2usize {
                        let y = row0 + dy;
                        let x = col0 + dx;
                        let color = cfa.color_at(y as i64 + roi_y, x as i64 + roi_x);
                        sum[color.index()] += raw.data[[y, x]] as f64;
                        count[color.index()] += 1;
                    }
                }
                let mut rgb = [0.0f32; 3];
                for c in 0..3 {
                    rgb[c] = if count[c] > 0 {
                        (sum[c] / count[c] as f64) as f32
                    } else {
                        0.0
                    };
                }
                rgb
            })
            .collect()
    };

    let rows: Vec<Vec<[f32; 3]>> = if parallel {
        (0..out_h).into_par_iter().map(compute_row).collect()
    } else {
        (0..out_h).map(compute_row).collect()
    };

    let mut out = WorkingImage::new(out_h, out_w);
    for (row, values) in rows.into_iter().enumerate() {
        for (col, rgb) in values.into_iter().enumerate() {
            out.set_pixel(row, col, rgb);
        }
    }
    out
}

/// Third-size X-Trans downscale: each output pixel is the 6x6 CFA cell's
/// per-color average (the cell always contains a fixed, pattern-independent
/// count of each color, so averaging needs no weighting).
pub fn third_size_xtrans(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64) -> WorkingImage {
    assert!(cfa.is_xtrans(), "third_size_xtrans requires an X-Trans pattern");
    let in_h = raw.height();
    let in_w = raw.width();
    let out_h = in_h / 6;
    let out_w = in_w / 6;
    let parallel = out_h * out_w >= PARALLEL_PIXEL_THRESHOLD;

    let compute_row = |out_row: usize| -> Vec<[f32; 3]> {
        let row0 = out_row * 6;
        (0..out_w)
            .map(|out_col| {
                let col0 = out_col * 6;
                let mut sum = [0.0f64; 3];
                let mut count = [0u32; 3];
                for dy in 0..6usize {
                    for dx in 0..6usize {
                        let y = row0 + dy;
                        let x = col0 + dx;
                        let color = cfa.color_at(y as i64 + roi_y, x as i64 + roi_x);
                        sum[color.index()] += raw.data[[y, x]] as f64;
                        count[color.index()] += 1;
                    }
                }
                let mut rgb = [0.0f32; 3];
                for c in 0..3 {
                    rgb[c] = if count[c] > 0 {
                        (sum[c] / count[c] as f64) as f32
                    } else {
                        0.0
                    };
                }
                rgb
            })
            .collect()
    };

    let rows: Vec<Vec<[f32; 3]>> = if parallel {
        (0..out_h).into_par_iter().map(compute_row).collect()
    } else {
        (0..out_h).map(compute_row).collect()
    };

    let mut out = WorkingImage::new(out_h, out_w);
    for (row, values) in rows.into_iter().enumerate() {
        for (col, rgb) in values.into_iter().enumerate() {
            out.set_pixel(row, col, rgb);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::{filters, XTRANS_CANONICAL};
    use ndarray::Array2;

    #[test]
    fn half_size_bayer_halves_dimensions() {
        let raw = RawImage::new(Array2::from_elem((16, 20), 0.5f32));
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let out = half_size_bayer(&raw, &cfa, 0, 0);
        assert_eq!(out.height(), 8);
        assert_eq!(out.width(), 10);
        for row in 0..8 {
            for col in 0..10 {
                let px = out.pixel(row, col);
                assert!((px[0] - 0.5).abs() < 1e-5);
                assert!((px[1] - 0.5).abs() < 1e-5);
                assert!((px[2] - 0.5).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn third_size_xtrans_thirds_dimensions() {
        let raw = RawImage::new(Array2::from_elem((18, 24), 0.5f32));
        let cfa = CfaPattern::XTrans(XTRANS_CANONICAL);
        let out = third_size_xtrans(&raw, &cfa, 0, 0);
        assert_eq!(out.height(), 3);
        assert_eq!(out.width(), 4);
        for row in 0..3 {
            for col in 0..4 {
                let px = out.pixel(row, col);
                assert!((px[0] - 0.5).abs() < 1e-5);
                assert!((px[1] - 0.5).abs() < 1e-5);
                assert!((px[2] - 0.5).abs() < 1e-5);
            }
        }
    }
}
