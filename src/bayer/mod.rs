//! Bayer-pattern demosaicing (spec §4.6).

pub mod ppg;
