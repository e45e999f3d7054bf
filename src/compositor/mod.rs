/// Per-chapter background tiles and crossfades.
pub mod chapters;
/// Chapter cover images, crush overlay and vignette.
pub mod covers;
/// Pre-rendered images (halos, gradients, vignette).
pub mod sprites;
