/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Markesteijn tile edge length (`TS` in the original algorithm).
pub const MARKESTEIJN_TILE_SIZE: usize = 256;

/// Markesteijn tiles advance by `TS - MARKESTEIJN_TILE_MARGIN` and are
/// entered/exited with a few pixels of halo on each side.
pub const MARKESTEIJN_TILE_MARGIN: usize = 16;

/// Border width the PPG Bayer border interpolator fills.
pub const PPG_BORDER: usize = 3;

/// Border width the X-Trans linear/VNG border interpolator fills.
pub const XTRANS_BORDER: usize = 1;

/// Mirrored halo width around a Markesteijn working image.
pub const MARKESTEIJN_HALO: usize = 6;

/// ISO-to-edge-threshold scale factor used by local green equilibration (§6).
pub const GREEN_EQ_ISO_SCALE: f32 = 0.0001;

/// Small epsilon guarding floating-point divisions.
pub const EPSILON: f32 = 1e-10;
