pub mod bayer;
pub mod border;
pub mod cfa;
pub mod consts;
pub mod dispatch;
pub mod error;
pub mod green_eq;
pub mod image;
pub mod median;
pub mod params;
pub mod roi;
pub mod smoothing;
pub mod subsample;
pub mod xtrans;
