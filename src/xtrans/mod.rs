//! X-Trans demosaicing (spec §4.7, §4.8, §4.9).

pub mod linear;
pub mod markesteijn;
pub mod vng;
