//! Raw/working image data model (spec §3).

use ndarray::{Array2, Array3};

use crate::error::{DemosaicError, Result};

/// A single-channel mosaicked raw buffer: one CFA sample per pixel,
/// row-major, nominally in `[0,1]` but not clamped (highlights may exceed 1).
#[derive(Clone, Debug)]
pub struct RawImage {
    pub data: Array2<f32>,
}

impl RawImage {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Clamped indexing: out-of-bounds coordinates are clamped to the
    /// nearest edge pixel. Used by border-handling kernels (spec §4.2).
    #[inline]
    pub fn get_clamped(&self, row: isize, col: isize) -> f32 {
        let h = self.height() as isize;
        let w = self.width() as isize;
        let r = row.clamp(0, h - 1) as usize;
        let c = col.clamp(0, w - 1) as usize;
        self.data[[r, c]]
    }
}

/// The demosaiced working image: a dense 2-D array of `(R, G, B, padding)`
/// tuples, row-major (spec §3). Padding is zero except where color
/// smoothing transiently repurposes it as scratch.
#[derive(Clone, Debug)]
pub struct WorkingImage {
    /// Shape `(height, width, 4)`.
    pub data: Array3<f32>,
}

impl WorkingImage {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            data: Array3::<f32>::zeros((height, width, 4)),
        }
    }

    pub fn from_array(data: Array3<f32>) -> Result<Self> {
        if data.dim().2 != 4 {
            return Err(DemosaicError::InvalidDimensions {
                width: data.dim().1,
                height: data.dim().0,
            });
        }
        Ok(Self { data })
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [f32; 4] {
        let d = &self.data;
        [
            d[[row, col, 0]],
            d[[row, col, 1]],
            d[[row, col, 2]],
            d[[row, col, 3]],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, row: usize, col: usize, rgb: [f32; 3]) {
        self.data[[row, col, 0]] = rgb[0];
        self.data[[row, col, 1]] = rgb[1];
        self.data[[row, col, 2]] = rgb[2];
    }

    /// Extract a single channel (0=R, 1=G, 2=B, 3=padding) as a dense plane.
    pub fn channel(&self, index: usize) -> Array2<f32> {
        self.data.index_axis(ndarray::Axis(2), index).to_owned()
    }
}
