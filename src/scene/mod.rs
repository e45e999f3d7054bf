/// Color parsing and blending.
pub mod color;
/// Scene input model (song, lyrics, beats, palette, cinematic direction).
pub mod model;
