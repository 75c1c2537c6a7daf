//! Top-level dispatcher (spec §4.11): chooses a demosaic path from the
//! requested method, ROI scale, and CFA kind, wires green equilibration,
//! pre-median, and color smoothing around it, and defines the trait seams
//! external collaborators plug into.

use tracing::{debug, warn};

use crate::bayer::ppg::demosaic_ppg;
use crate::cfa::CfaPattern;
use crate::consts::GREEN_EQ_ISO_SCALE;
use crate::error::{DemosaicError, Result};
use crate::green_eq::{apply_green_eq, GreenEqMode};
use crate::image::{RawImage, WorkingImage};
use crate::median::pre_median_green;
use crate::params::DemosaicParams;
use crate::roi::Roi;
use crate::smoothing::color_smooth;
use crate::subsample::{half_size_bayer, third_size_xtrans};
use crate::xtrans::linear::xtrans_linear;
use crate::xtrans::markesteijn::xtrans_markesteijn;
use crate::xtrans::vng::xtrans_vng;

use crate::params::DemosaicMethod;

/// Generic resampling collaborator (spec §6): the crate that owns the
/// downstream resize/crop pipeline implements this. Not implemented here —
/// resizing to an arbitrary (non-CFA-aligned) output size is out of scope.
pub trait Resampler {
    fn resample(&self, image: &WorkingImage, target_width: usize, target_height: usize) -> WorkingImage;
}

/// AMAZE Bayer demosaic collaborator (spec §6): `DemosaicMethod::Amaze`
/// dispatches here instead of to a built-in implementation, since AMAZE's
/// algorithm is a distinct, much larger body of work out of scope for this
/// crate.
pub trait AlternateBayerDemosaic {
    fn demosaic(&self, raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64) -> WorkingImage;
}

/// Scale below which a fused downscale fast path is used instead of full
/// interpolation followed by downsampling (spec §2).
const FAST_PATH_SCALE_THRESHOLD: f32 = 0.5;

/// Apply the pre-median pass to `raw`'s green plane if `threshold > 0.0`
/// (spec §4.5, one pass as required by every current caller); otherwise
/// return a clone of `raw` unchanged.
fn maybe_pre_median(raw: &RawImage, cfa: &CfaPattern, roi_x: i64, roi_y: i64, threshold: f32) -> RawImage {
    if threshold > 0.0 {
        let data = pre_median_green(&raw.data, |r, c| cfa.color_at(r + roi_y, c + roi_x), 1, threshold);
        RawImage::new(data)
    } else {
        raw.clone()
    }
}

/// Run the configured method over `raw`, snapping `roi` to the CFA phase
/// first (spec §4.11). Green equilibration and the pre-median pass only
/// apply to Bayer sensors; color smoothing runs on every path's output.
/// `iso` scales the local green-equilibration edge threshold
/// (`GREEN_EQ_ISO_SCALE * iso`, spec §6). `amaze` is consulted only when
/// `params.demosaicing_method` is `Amaze`; pass `None` if the caller has no
/// such collaborator available, in which case that request downgrades to
/// PPG with a warning.
pub fn dispatch(
    raw: &RawImage,
    cfa: &CfaPattern,
    roi: &Roi,
    params: &DemosaicParams,
    iso: f32,
    amaze: Option<&dyn AlternateBayerDemosaic>,
) -> Result<WorkingImage> {
    if raw.width() == 0 || raw.height() == 0 {
        return Err(DemosaicError::InvalidDimensions {
            width: raw.width(),
            height: raw.height(),
        });
    }

    let snapped = roi.snap_to_cfa_phase(cfa, raw.width(), raw.height());
    let roi_x = snapped.x as i64;
    let roi_y = snapped.y as i64;
    let is_bayer = cfa.is_bayer();

    if is_bayer != params.demosaicing_method.is_bayer()
        && !matches!(params.demosaicing_method, DemosaicMethod::Amaze)
    {
        debug!(
            method = ?params.demosaicing_method,
            is_xtrans = cfa.is_xtrans(),
            "method/CFA mismatch, falling back to the matching default"
        );
    }

    // Stage 1: green equilibration (Bayer only, spec §4.3/§4.4).
    let eq_raw: RawImage = if is_bayer && params.green_eq != GreenEqMode::No {
        match cfa {
            CfaPattern::Bayer(filters) => {
                let threshold = GREEN_EQ_ISO_SCALE * iso;
                let data = apply_green_eq(&raw.data, params.green_eq, *filters, roi_x, roi_y, threshold);
                RawImage::new(data)
            }
            CfaPattern::XTrans(_) => raw.clone(),
        }
    } else {
        raw.clone()
    };
    let raw = &eq_raw;

    if snapped.scale < FAST_PATH_SCALE_THRESHOLD {
        debug!(scale = snapped.scale, "using fused downscale fast path");
        let pre_raw = if is_bayer {
            maybe_pre_median(raw, cfa, roi_x, roi_y, params.median_thrs)
        } else {
            raw.clone()
        };
        let mut out = match cfa {
            CfaPattern::Bayer(_) => half_size_bayer(&pre_raw, cfa, roi_x, roi_y),
            CfaPattern::XTrans(_) => third_size_xtrans(&pre_raw, cfa, roi_x, roi_y),
        };
        color_smooth(&mut out, params.color_smoothing);
        return Ok(out);
    }

    let method = match (cfa, params.demosaicing_method) {
        (CfaPattern::XTrans(_), m) if m.is_bayer() => {
            warn!("Bayer method requested for an X-Trans sensor, downgrading to linear");
            DemosaicMethod::XtransLinear
        }
        (CfaPattern::Bayer(_), m) if m.is_xtrans() => {
            warn!("X-Trans method requested for a Bayer sensor, downgrading to PPG");
            DemosaicMethod::Ppg
        }
        (_, m) => m,
    };

    let mut out = match method {
        DemosaicMethod::Ppg => demosaic_ppg(raw, cfa, roi_x, roi_y, params.median_thrs),
        DemosaicMethod::Amaze => match amaze {
            Some(collaborator) => {
                let pre_raw = maybe_pre_median(raw, cfa, roi_x, roi_y, params.median_thrs);
                collaborator.demosaic(&pre_raw, cfa, roi_x, roi_y)
            }
            None => {
                warn!("AMAZE requested but no collaborator registered, downgrading to PPG");
                demosaic_ppg(raw, cfa, roi_x, roi_y, params.median_thrs)
            }
        },
        DemosaicMethod::XtransLinear => xtrans_linear(raw, cfa, roi_x, roi_y),
        DemosaicMethod::XtransVng => xtrans_vng(raw, cfa, roi_x, roi_y),
        DemosaicMethod::XtransMarkesteijn1 => xtrans_markesteijn(raw, cfa, roi_x, roi_y, 1),
        DemosaicMethod::XtransMarkesteijn3 => xtrans_markesteijn(raw, cfa, roi_x, roi_y, 3),
    };

    // Stage 3: color smoothing (spec §4.10), applied after every path.
    color_smooth(&mut out, params.color_smoothing);
    Ok(out)
}

/// Map a coarse [`crate::params::QualityTier`] onto a concrete method for a
/// given CFA kind (spec §4.11 "quality downgrade").
pub fn method_for_quality(tier: crate::params::QualityTier, cfa: &CfaPattern) -> DemosaicMethod {
    use crate::params::QualityTier;
    match (tier, cfa.is_xtrans()) {
        (QualityTier::Preview, false) => DemosaicMethod::Ppg,
        (QualityTier::Preview, true) => DemosaicMethod::XtransLinear,
        (QualityTier::Full, false) => DemosaicMethod::Ppg,
        (QualityTier::Full, true) => DemosaicMethod::XtransVng,
        (QualityTier::Best, false) => DemosaicMethod::Ppg,
        (QualityTier::Best, true) => DemosaicMethod::XtransMarkesteijn3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::{filters, XTRANS_CANONICAL};
    use ndarray::Array2;

    #[test]
    fn dispatch_rejects_empty_raw() {
        let raw = RawImage::new(Array2::<f32>::zeros((0, 0)));
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi::full(0, 0);
        let params = DemosaicParams::default();
        assert!(dispatch(&raw, &cfa, &roi, &params, 100.0, None).is_err());
    }

    #[test]
    fn dispatch_downgrades_amaze_without_collaborator() {
        let raw = RawImage::new(Array2::from_elem((16, 16), 0.5f32));
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi::full(16, 16);
        let mut params = DemosaicParams::default();
        params.demosaicing_method = DemosaicMethod::Amaze;
        let out = dispatch(&raw, &cfa, &roi, &params, 100.0, None).unwrap();
        assert_eq!(out.height(), 16);
    }

    #[test]
    fn dispatch_uses_fast_path_below_scale_threshold() {
        let raw = RawImage::new(Array2::from_elem((16, 16), 0.5f32));
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
            scale: 0.25,
        };
        let params = DemosaicParams::default();
        let out = dispatch(&raw, &cfa, &roi, &params, 100.0, None).unwrap();
        assert_eq!(out.height(), 8);
        assert_eq!(out.width(), 8);
    }

    #[test]
    fn dispatch_downgrades_bayer_method_on_xtrans_sensor() {
        let raw = RawImage::new(Array2::from_elem((18, 18), 0.5f32));
        let cfa = CfaPattern::XTrans(XTRANS_CANONICAL);
        let roi = Roi::full(18, 18);
        let params = DemosaicParams::default(); // Ppg
        let out = dispatch(&raw, &cfa, &roi, &params, 100.0, None).unwrap();
        for row in 2..16 {
            for col in 2..16 {
                for v in out.pixel(row, col) {
                    assert!((v - 0.5).abs() < 1e-4 || v == 0.0);
                }
            }
        }
    }

    #[test]
    fn dispatch_applies_green_eq_and_pre_median_without_panicking() {
        let raw = RawImage::new(Array2::from_shape_fn((20, 20), |(r, c)| {
            0.5 + 0.01 * (((r + c) % 5) as f32)
        }));
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi::full(20, 20);
        let mut params = DemosaicParams::default();
        params.green_eq = GreenEqMode::Full;
        params.median_thrs = 0.05;
        params.color_smoothing = 1;
        let out = dispatch(&raw, &cfa, &roi, &params, 100.0, None).unwrap();
        for row in 4..16 {
            for col in 4..16 {
                for v in out.pixel(row, col) {
                    assert!(v.is_finite());
                }
            }
        }
    }
}
