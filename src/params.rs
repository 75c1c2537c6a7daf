//! Versioned demosaic parameters (spec §6), mirroring the persisted,
//! forward-migrated config records used elsewhere in this crate's ambient
//! stack.

use serde::{Deserialize, Serialize};

use crate::green_eq::GreenEqMode;

/// Interpolation method selector (spec §6). Numeric values match the wire
/// encoding external callers persist alongside [`DemosaicParams`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum DemosaicMethod {
    Ppg = 0,
    /// AMAZE is out of scope here; see [`crate::dispatch::AlternateBayerDemosaic`].
    Amaze = 1,
    XtransLinear = 0x400,
    XtransVng = 0x401,
    XtransMarkesteijn1 = 0x402,
    XtransMarkesteijn3 = 0x403,
}

impl DemosaicMethod {
    pub fn is_xtrans(self) -> bool {
        matches!(
            self,
            DemosaicMethod::XtransLinear
                | DemosaicMethod::XtransVng
                | DemosaicMethod::XtransMarkesteijn1
                | DemosaicMethod::XtransMarkesteijn3
        )
    }

    pub fn is_bayer(self) -> bool {
        matches!(self, DemosaicMethod::Ppg | DemosaicMethod::Amaze)
    }
}

/// Coarse quality tier a caller maps onto a concrete [`DemosaicMethod`]
/// (spec §4.11 "quality downgrade").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Preview,
    Full,
    Best,
}

/// Tiling callback contract the caller's scheduler must honor when driving
/// tile-based methods (Markesteijn): each tile must overlap its neighbors by
/// `overlap` pixels and align to `alignment` so CFA phase is preserved.
#[derive(Clone, Copy, Debug)]
pub struct TilingContract {
    pub overlap: usize,
    pub alignment: usize,
    /// Working-set multiplier over the raw tile's byte size a caller should
    /// budget for scratch buffers.
    pub memory_factor: f32,
}

impl DemosaicMethod {
    pub fn tiling_contract(self) -> TilingContract {
        match self {
            DemosaicMethod::XtransMarkesteijn1 | DemosaicMethod::XtransMarkesteijn3 => {
                TilingContract {
                    overlap: 5,
                    alignment: 6,
                    memory_factor: 4.0,
                }
            }
            DemosaicMethod::XtransVng | DemosaicMethod::XtransLinear => TilingContract {
                overlap: 5,
                alignment: 3,
                memory_factor: 2.0,
            },
            DemosaicMethod::Ppg | DemosaicMethod::Amaze => TilingContract {
                overlap: 5,
                alignment: 2,
                memory_factor: 2.0,
            },
        }
    }
}

/// Version 2 of the persisted parameter record, kept only so
/// [`DemosaicParams::from_v2`] can upgrade it. Spec §6: `{green_eq,
/// median_thrs}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DemosaicParamsV2 {
    pub green_eq: bool,
    pub median_thrs: f32,
}

/// Current persisted parameter record (spec §6):
/// `{green_eq, median_thrs, color_smoothing, demosaicing_method, reserved}`.
/// Upgrading from v2 keeps `green_eq`/`median_thrs` and zeroes the three
/// fields new in v3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DemosaicParamsV3 {
    pub version: u32,
    pub green_eq: GreenEqMode,
    pub median_thrs: f32,
    pub color_smoothing: u32,
    pub demosaicing_method: DemosaicMethod,
    pub reserved: u32,
}

impl Default for DemosaicParamsV3 {
    fn default() -> Self {
        Self {
            version: 3,
            green_eq: GreenEqMode::No,
            median_thrs: 0.0,
            color_smoothing: 0,
            demosaicing_method: DemosaicMethod::Ppg,
            reserved: 0,
        }
    }
}

impl DemosaicParamsV3 {
    pub fn from_v2(v2: DemosaicParamsV2) -> Self {
        Self {
            version: 3,
            green_eq: if v2.green_eq {
                GreenEqMode::Full
            } else {
                GreenEqMode::No
            },
            median_thrs: v2.median_thrs,
            color_smoothing: 0,
            demosaicing_method: DemosaicMethod::Ppg,
            reserved: 0,
        }
    }
}

pub type DemosaicParams = DemosaicParamsV3;
