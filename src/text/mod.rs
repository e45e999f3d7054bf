/// Display font loading.
pub mod fonts;
/// Parley shaping and measurement.
pub mod shaper;
