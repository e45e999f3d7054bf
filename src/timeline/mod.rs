/// Baked keyframe data types.
pub mod keyframe;
/// Time-indexed keyframe store with lossless rescaling.
pub mod store;
