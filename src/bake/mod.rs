/// Baker seam and file-backed baker.
pub mod baker;
/// Session-keyed shared bake cache.
pub mod registry;
