//! Green equilibration (spec §4.3/§4.4): corrects systematic differences
//! between the two Bayer green sites.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cfa::{fc_bayer, CfaColor};
use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use ndarray::Array2;

/// Green-eq enum (spec §6): `NO=0, LOCAL=1, FULL=2, BOTH=3`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum GreenEqMode {
    #[default]
    No = 0,
    Local = 1,
    Full = 2,
    Both = 3,
}

/// Find the phase offset `(oj, oi)` such that `color_at(y+oj, x+oi)` is the
/// first green site, matching the `favg`/`lavg` phase-finding preamble in
/// the original implementation.
fn first_green_phase(filters: u32, x: i64, y: i64) -> (i64, i64) {
    let mut oj = 0i64;
    let mut oi = 0i64;
    if (fc_bayer(oj + y, oi + x, filters).index() & 1) != 1 {
        oi += 1;
    }
    (oj, oi)
}

/// Global-ratio green equilibration (spec §4.3). Scales every first-green
/// site by `sum2/sum1`; if either sum is non-positive, the buffer is
/// returned unchanged (degenerate-input pass-through, spec §7).
pub fn green_equilibrate_favg(raw: &Array2<f32>, filters: u32, x: i64, y: i64) -> Array2<f32> {
    let (height, width) = raw.dim();
    let (oj, oi) = first_green_phase(filters, x, y);
    let g2_offset: i64 = if oi != 0 { -1 } else { 1 };

    let mut out = raw.clone();
    if oj < 0 || oi < 0 {
        return out;
    }
    let (oj, oi) = (oj as usize, oi as usize);

    let mut sum1 = 0.0f64;
    let mut sum2 = 0.0f64;
    let limit_i = (width as i64 - 1 - g2_offset).max(0) as usize;

    let mut j = oj;
    while j < height.saturating_sub(1) {
        let mut i = oi;
        while i < limit_i {
            sum1 += raw[[j, i]] as f64;
            let i2 = (i as i64 + g2_offset) as usize;
            sum2 += raw[[j + 1, i2]] as f64;
            i += 2;
        }
        j += 2;
    }

    if sum1 <= 0.0 || sum2 <= 0.0 {
        return out;
    }
    let ratio = sum1 / sum2;

    let mut j = oj;
    while j < height.saturating_sub(1) {
        let mut i = oi;
        while i < limit_i {
            out[[j, i]] = raw[[j, i]] / ratio as f32;
            i += 2;
        }
        j += 2;
    }
    out
}

/// Local, edge-gated green equilibration (spec §4.4).
///
/// `threshold` is the caller's `max * thr` with `max = 1.0`; callers pass
/// `0.0001 * iso` per spec §6.
pub fn green_equilibrate_lavg(
    raw: &Array2<f32>,
    filters: u32,
    x: i64,
    y: i64,
    threshold: f32,
    in_place_source: Option<&Array2<f32>>,
) -> Array2<f32> {
    let (height, width) = raw.dim();
    let source = in_place_source.unwrap_or(raw);

    let mut oj = 2i64;
    let mut oi = 2i64;
    if fc_bayer(oj + y, oi + x, filters) != CfaColor::Green {
        oj += 1;
    }
    if fc_bayer(oj + y, oi + x, filters) != CfaColor::Green {
        oi += 1;
    }
    if fc_bayer(oj + y, oi + x, filters) != CfaColor::Green {
        oj -= 1;
    }

    let mut out = raw.clone();
    if height < 3 || width < 3 {
        return out;
    }
    let oj = oj.max(0) as usize;
    let oi = oi.max(0) as usize;

    let parallel = height * width >= PARALLEL_PIXEL_THRESHOLD;
    let row_count = (height.saturating_sub(2) - oj.min(height.saturating_sub(2))).div_ceil(2);
    let _ = row_count;

    let compute_row = |j: usize| -> Option<Vec<(usize, f32)>> {
        if j + 2 >= height {
            return None;
        }
        let mut updates = Vec::new();
        let mut i = oi;
        while i + 2 < width {
            let o1_1 = source[[j - 1, i - 1]];
            let o1_2 = source[[j - 1, i + 1]];
            let o1_3 = source[[j + 1, i - 1]];
            let o1_4 = source[[j + 1, i + 1]];
            let o2_1 = source[[j - 2, i]];
            let o2_2 = source[[j + 2, i]];
            let o2_3 = source[[j, i - 2]];
            let o2_4 = source[[j, i + 2]];

            let m1 = (o1_1 + o1_2 + o1_3 + o1_4) / 4.0;
            let m2 = (o2_1 + o2_2 + o2_3 + o2_4) / 4.0;

            if m2 > 0.0 && m1 / m2 < 2.0 {
                let c1 = (f32::abs(o1_1 - o1_2)
                    + f32::abs(o1_1 - o1_3)
                    + f32::abs(o1_1 - o1_4)
                    + f32::abs(o1_2 - o1_3)
                    + f32::abs(o1_3 - o1_4)
                    + f32::abs(o1_2 - o1_4))
                    / 6.0;
                let c2 = (f32::abs(o2_1 - o2_2)
                    + f32::abs(o2_1 - o2_3)
                    + f32::abs(o2_1 - o2_4)
                    + f32::abs(o2_2 - o2_3)
                    + f32::abs(o2_3 - o2_4)
                    + f32::abs(o2_2 - o2_4))
                    / 6.0;
                let center = source[[j, i]];
                if center < 0.95 && c1 < threshold && c2 < threshold {
                    updates.push((i, center * m1 / m2));
                }
            }
            i += 2;
        }
        Some(updates)
    };

    if parallel && oj + 2 < height {
        let rows: Vec<(usize, Vec<(usize, f32)>)> = (oj..height - 2)
            .into_par_iter()
            .step_by(2)
            .filter_map(|j| compute_row(j).map(|u| (j, u)))
            .collect();
        for (j, updates) in rows {
            for (i, val) in updates {
                out[[j, i]] = val;
            }
        }
    } else {
        let mut j = oj;
        while j + 2 < height {
            if let Some(updates) = compute_row(j) {
                for (i, val) in updates {
                    out[[j, i]] = val;
                }
            }
            j += 2;
        }
    }

    out
}

/// Run `favg` then `lavg` in place (spec §4.4 "`both` mode").
pub fn green_equilibrate_both(
    raw: &Array2<f32>,
    filters: u32,
    x: i64,
    y: i64,
    threshold: f32,
) -> Array2<f32> {
    let after_favg = green_equilibrate_favg(raw, filters, x, y);
    green_equilibrate_lavg(&after_favg, filters, x, y, threshold, Some(&after_favg))
}

/// Dispatch on [`GreenEqMode`]; `No` returns a clone of `raw` unchanged.
pub fn apply_green_eq(
    raw: &Array2<f32>,
    mode: GreenEqMode,
    filters: u32,
    x: i64,
    y: i64,
    threshold: f32,
) -> Array2<f32> {
    match mode {
        GreenEqMode::No => raw.clone(),
        GreenEqMode::Full => green_equilibrate_favg(raw, filters, x, y),
        GreenEqMode::Local => green_equilibrate_lavg(raw, filters, x, y, threshold, None),
        GreenEqMode::Both => green_equilibrate_both(raw, filters, x, y, threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::filters as cfa_filters;

    #[test]
    fn favg_idempotent_on_uniform_input() {
        let raw = Array2::from_elem((16, 16), 0.5f32);
        let out = green_equilibrate_favg(&raw, cfa_filters::RGGB, 0, 0);
        for v in out.iter() {
            assert!((v - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn lavg_idempotent_on_uniform_input() {
        let raw = Array2::from_elem((16, 16), 0.5f32);
        let out = green_equilibrate_lavg(&raw, cfa_filters::RGGB, 0, 0, 0.01, None);
        for v in out.iter() {
            assert!((v - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn favg_known_imbalance_scales_first_green_to_match_second() {
        // Build a Bayer buffer: first-green sites = 1.0, second-green = 0.5,
        // R/B arbitrary (set to 0.2/0.8). After favg, first-green -> 0.5.
        let filters = cfa_filters::RGGB;
        let mut raw = Array2::<f32>::zeros((16, 16));
        for r in 0..16 {
            for c in 0..16 {
                raw[[r, c]] = match fc_bayer(r as i64, c as i64, filters) {
                    CfaColor::Red => 0.2,
                    CfaColor::Blue => 0.8,
                    CfaColor::Green => {
                        // first green: row even, col odd for RGGB
                        if r % 2 == 0 {
                            1.0
                        } else {
                            0.5
                        }
                    }
                };
            }
        }
        let out = green_equilibrate_favg(&raw, filters, 0, 0);
        for r in (0..14).step_by(2) {
            for c in (1..14).step_by(2) {
                if fc_bayer(r as i64, c as i64, filters) == CfaColor::Green {
                    assert!(
                        (out[[r, c]] - 0.5).abs() < 1e-4,
                        "out[{r},{c}] = {}",
                        out[[r, c]]
                    );
                }
            }
        }
    }

    #[test]
    fn favg_degenerate_sum_passes_through_unchanged() {
        let raw = Array2::<f32>::zeros((16, 16));
        let out = green_equilibrate_favg(&raw, cfa_filters::RGGB, 0, 0);
        assert_eq!(out, raw);
    }
}
