use serde::Serialize;
use smallvec::SmallVec;

use crate::render::words::WordStats;
use crate::sim::SimKind;

/// Layers in draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Surface cleared to black.
    Clear,
    /// Chapter background tiles.
    Background,
    /// Chapter covers with crush and vignette.
    Covers,
    /// Active pixel simulation.
    Simulation,
    /// Beat lighting pulse.
    Lighting,
    /// Emotional event overlays.
    Events,
    /// Word chunks under the camera transform.
    Words,
    /// Baked floating particles.
    Particles,
    /// Comment comets.
    Comets,
    /// Word emitters.
    Emitters,
    /// Watermark badge.
    Watermark,
}

/// Read-only snapshot of one rendered frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameMetrics {
    /// Frames rendered by the player so far, this one included.
    pub frame: u64,
    /// Audio time the frame shows (s).
    pub song_time: f64,
    /// Song progress in `0..1`.
    pub progress: f64,
    /// Keyframe drawn.
    pub keyframe_index: Option<usize>,
    /// Current chapter.
    pub chapter: usize,
    /// Layers actually drawn, in order.
    pub layers: SmallVec<[Layer; 11]>,
    /// Word pass counters.
    pub words: WordStats,
    /// Simulation shown.
    pub sim: Option<SimKind>,
    /// Whether the simulation stepped this frame.
    pub sim_stepped: bool,
    /// Simulation steps so far.
    pub sim_steps: u64,
    /// Active emotional events.
    pub active_events: usize,
    /// Emotional events fired so far.
    pub events_fired: u32,
    /// Live word emitters.
    pub emitters: usize,
    /// Live comets.
    pub comets: usize,
    /// Frames that failed to draw so far.
    pub draw_errors: u64,
    /// Missing chunk lookups so far.
    pub missing_total: u64,
    /// Whether an export is capturing.
    pub exporting: bool,
    /// Frames pushed to the running export.
    pub export_frames: u64,
    /// Wall time spent drawing (ms).
    pub draw_ms: f64,
}

impl FrameMetrics {
    /// Whether `layer` was drawn.
    pub fn drew(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }

    /// Record a drawn layer.
    pub(crate) fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }
}
