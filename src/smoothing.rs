//! Color smoothing (spec §4.10): median-filters the R-G and B-G chroma
//! differences over each pixel's 3x3 neighborhood to suppress demosaic
//! artifacts without touching luminance.

use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::image::WorkingImage;
use ndarray::Array2;

#[inline]
fn pix_sort(p: &mut [f32; 9], i: usize, j: usize) {
    if p[i] > p[j] {
        p.swap(i, j);
    }
}

/// Median of 9 via the classic 19-comparator sorting network.
#[inline]
fn median9(p: &mut [f32; 9]) -> f32 {
    pix_sort(p, 1, 2);
    pix_sort(p, 4, 5);
    pix_sort(p, 7, 8);
    pix_sort(p, 0, 1);
    pix_sort(p, 3, 4);
    pix_sort(p, 6, 7);
    pix_sort(p, 1, 2);
    pix_sort(p, 4, 5);
    pix_sort(p, 7, 8);
    pix_sort(p, 0, 3);
    pix_sort(p, 5, 8);
    pix_sort(p, 4, 7);
    pix_sort(p, 3, 6);
    pix_sort(p, 1, 4);
    pix_sort(p, 2, 5);
    pix_sort(p, 4, 7);
    pix_sort(p, 4, 2);
    pix_sort(p, 6, 4);
    pix_sort(p, 4, 2);
    p[4]
}

fn gather_3x3(plane: &Array2<f32>, row: usize, col: usize, height: usize, width: usize) -> [f32; 9] {
    let mut out = [0.0f32; 9];
    let mut k = 0;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let y = (row as i64 + dy).clamp(0, height as i64 - 1) as usize;
            let x = (col as i64 + dx).clamp(0, width as i64 - 1) as usize;
            out[k] = plane[[y, x]];
            k += 1;
        }
    }
    out
}

/// Run `passes` rounds of median-of-9 smoothing on the R-G and B-G
/// differences, writing R and B back as `G + median(diff)`. Green and the
/// padding channel are left untouched.
pub fn color_smooth(image: &mut WorkingImage, passes: u32) {
    let height = image.height();
    let width = image.width();

    for _ in 0..passes {
        let green = image.channel(1);
        let mut rg_diff = Array2::<f32>::zeros((height, width));
        let mut bg_diff = Array2::<f32>::zeros((height, width));
        for row in 0..height {
            for col in 0..width {
                let px = image.pixel(row, col);
                rg_diff[[row, col]] = px[0] - px[1];
                bg_diff[[row, col]] = px[2] - px[1];
            }
        }

        let parallel = height * width >= PARALLEL_PIXEL_THRESHOLD;
        let compute_row = |row: usize| -> (Vec<f32>, Vec<f32>) {
            let mut rg_row = Vec::with_capacity(width);
            let mut bg_row = Vec::with_capacity(width);
            for col in 0..width {
                let mut rg = gather_3x3(&rg_diff, row, col, height, width);
                let mut bg = gather_3x3(&bg_diff, row, col, height, width);
                rg_row.push(median9(&mut rg));
                bg_row.push(median9(&mut bg));
            }
            (rg_row, bg_row)
        };

        let rows: Vec<(Vec<f32>, Vec<f32>)> = if parallel {
            (0..height).into_par_iter().map(compute_row).collect()
        } else {
            (0..height).map(compute_row).collect()
        };

        for (row, (rg_row, bg_row)) in rows.into_iter().enumerate() {
            for col in 0..width {
                let g = green[[row, col]];
                image.data[[row, col, 0]] = (g + rg_row[col]).max(0.0);
                image.data[[row, col, 2]] = (g + bg_row[col]).max(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_is_idempotent() {
        let mut img = WorkingImage::new(8, 8);
        for row in 0..8 {
            for col in 0..8 {
                img.set_pixel(row, col, [0.4, 0.5, 0.6]);
            }
        }
        color_smooth(&mut img, 1);
        for row in 0..8 {
            for col in 0..8 {
                let px = img.pixel(row, col);
                assert!((px[0] - 0.4).abs() < 1e-5);
                assert!((px[1] - 0.5).abs() < 1e-5);
                assert!((px[2] - 0.6).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn suppresses_isolated_chroma_outlier() {
        let mut img = WorkingImage::new(9, 9);
        for row in 0..9 {
            for col in 0..9 {
                img.set_pixel(row, col, [0.5, 0.5, 0.5]);
            }
        }
        img.set_pixel(4, 4, [0.9, 0.5, 0.1]);
        color_smooth(&mut img, 1);
        let px = img.pixel(4, 4);
        // The outlier's chroma difference is not the median of its 3x3
        // neighborhood of all-zero diffs, so it gets replaced.
        assert!((px[0] - 0.5).abs() < 1e-5);
        assert!((px[2] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn median9_matches_naive_median_on_samples() {
        let mut samples = [5.0, 1.0, 9.0, 3.0, 7.0, 2.0, 8.0, 4.0, 6.0];
        let mut sorted = samples;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected = sorted[4];
        assert_eq!(median9(&mut samples), expected);
    }
}
