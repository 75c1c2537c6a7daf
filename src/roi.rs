//! Region of interest and CFA-phase-preserving ROI snapping (spec §3, §4.11).

use crate::cfa::CfaPattern;

/// `{x, y, width, height, scale}` where `scale` is output pixels per input
/// pixel. `scale = 1.0` for the demosaic core proper.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub scale: f32,
}

impl Roi {
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            scale: 1.0,
        }
    }

    /// Snap `x`/`y` down to the CFA period and round width/height up to the
    /// full buffer when within `max(ceil(1/scale), 10)` pixels of it (spec
    /// §4.11 "ROI phase constraint").
    pub fn snap_to_cfa_phase(&self, cfa: &CfaPattern, buf_width: usize, buf_height: usize) -> Roi {
        let period = cfa.period();
        let x = (self.x / period) * period;
        let y = (self.y / period) * period;

        let tolerance = ((1.0 / self.scale).ceil() as usize).max(10);

        let width = if buf_width.abs_diff(self.width) < tolerance {
            buf_width
        } else {
            self.width
        };
        let height = if buf_height.abs_diff(self.height) < tolerance {
            buf_height
        } else {
            self.height
        };

        Roi {
            x,
            y,
            width,
            height,
            scale: self.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::filters;

    #[test]
    fn snaps_bayer_offset_down_to_period_2() {
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi {
            x: 5,
            y: 7,
            width: 100,
            height: 100,
            scale: 1.0,
        };
        let snapped = roi.snap_to_cfa_phase(&cfa, 200, 200);
        assert_eq!(snapped.x, 4);
        assert_eq!(snapped.y, 6);
    }

    #[test]
    fn snaps_xtrans_offset_down_to_period_6() {
        let cfa = CfaPattern::XTrans([[0; 6]; 6]);
        let roi = Roi {
            x: 10,
            y: 13,
            width: 100,
            height: 100,
            scale: 1.0,
        };
        let snapped = roi.snap_to_cfa_phase(&cfa, 200, 200);
        assert_eq!(snapped.x, 6);
        assert_eq!(snapped.y, 12);
    }

    #[test]
    fn rounds_dimensions_up_to_full_buffer_near_edge() {
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi {
            x: 0,
            y: 0,
            width: 195,
            height: 198,
            scale: 1.0,
        };
        let snapped = roi.snap_to_cfa_phase(&cfa, 200, 200);
        assert_eq!(snapped.width, 200);
        assert_eq!(snapped.height, 200);
    }

    #[test]
    fn leaves_dimensions_alone_when_far_from_full_buffer() {
        let cfa = CfaPattern::Bayer(filters::RGGB);
        let roi = Roi {
            x: 0,
            y: 0,
            width: 50,
            height: 50,
            scale: 1.0,
        };
        let snapped = roi.snap_to_cfa_phase(&cfa, 200, 200);
        assert_eq!(snapped.width, 50);
        assert_eq!(snapped.height, 50);
    }
}
