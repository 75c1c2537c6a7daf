use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemosaicError {
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("scratch buffer allocation failed ({context}, {bytes} bytes requested)")]
    Allocation { context: &'static str, bytes: usize },

    #[error("unsupported demosaicing method {0:#x} for this CFA kind")]
    UnsupportedMethod(u32),

    #[error("ROI {roi:?} is out of bounds for a {width}x{height} raw buffer")]
    RoiOutOfBounds {
        roi: (usize, usize, usize, usize),
        width: usize,
        height: usize,
    },

    #[error("operation aborted before completion")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, DemosaicError>;
