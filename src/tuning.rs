//! Hand-tuned look constants.
//!
//! None of these follow from a formula; they were picked by eye and are kept together so they
//! can be adjusted without touching the drawing code.

// Text and chunking.
/// Average glyph advance (in em) used when no font metrics are available.
pub const FALLBACK_ADVANCE_EM: f64 = 0.56;
/// Maximum words in one phrase group before it is closed.
pub const MAX_PHRASE_WORDS: u32 = 4;

// Simulators.
/// Simulation grid width (cells).
pub const SIM_GRID_W: u32 = 80;
/// Simulation grid height (cells).
pub const SIM_GRID_H: u32 = 60;
/// Default cap on simulation steps per second of song time.
pub const SIM_RATE_HZ: f64 = 20.0;
/// Opacity the active simulation layer is composited at.
pub const SIM_LAYER_OPACITY: f32 = 0.38;
/// Per-step heat loss for fire.
pub const FIRE_COOLING: f32 = 0.02;
/// Per-step heat loss for embers (lowest, lingering glow).
pub const EMBER_COOLING: f32 = 0.008;
/// Per-step heat loss for smoke (highest, fast dissipation).
pub const SMOKE_COOLING: f32 = 0.035;
/// Wave damping per step.
pub const WATER_DAMPING: f32 = 0.985;
/// Chance per step of a random drop.
pub const WATER_DROP_CHANCE: f32 = 0.3;
/// Beat pulse level that triggers a center disturbance.
pub const WATER_BEAT_THRESHOLD: f64 = 0.85;
/// Amplitude of the beat disturbance.
pub const WATER_BEAT_AMPLITUDE: f32 = 0.9;
/// Half-width of an aurora band (normalized height).
pub const AURORA_BAND_WIDTH: f64 = 0.08;
/// Number of rain drops.
pub const RAIN_DROPS: usize = 120;
/// Opacity of the rain base fill.
pub const RAIN_BASE_ALPHA: f64 = 0.85;
/// Extra fall speed at full beat pulse.
pub const RAIN_BEAT_BOOST: f64 = 0.8;

// Beat and lighting.
/// Exponential decay rate of the beat pulse (1/s).
pub const BEAT_PULSE_DECAY: f64 = 6.0;
/// Peak opacity of the lighting pulse overlay.
pub const LIGHTING_PULSE_OPACITY: f64 = 0.12;

// Backgrounds.
/// Tint level at the top of a chapter tile.
pub const CHAPTER_TILE_TOP: f64 = 0.28;
/// Tint level at the top of the synthetic default tile (near-black).
pub const DEFAULT_TILE_TOP: f64 = 0.08;
/// Largest chapter tile edge in pixels; bigger surfaces stretch the tile.
pub const CHAPTER_TILE_MAX_PX: u32 = 2048;
/// Opacity of chapter cover images.
pub const COVER_OPACITY: f64 = 0.35;
/// Largest decoded cover edge in pixels.
pub const COVER_MAX_PX: u32 = 1024;
/// Crush overlay opacity over a black image.
pub const CRUSH_BASE: f64 = 0.25;
/// Extra crush opacity at full image luminance.
pub const CRUSH_GAIN: f64 = 0.45;
/// Edge of the downsample used for image luminance.
pub const LUMINANCE_SAMPLE_PX: u32 = 16;
/// Largest vignette sprite edge in pixels.
pub const VIGNETTE_MAX_PX: u32 = 1024;
/// Corner darkness of the radial vignette.
pub const VIGNETTE_STRENGTH: f64 = 0.75;

// Words.
/// Edge of the cached halo sprite.
pub const HALO_SPRITE_PX: u32 = 128;
/// Halo diameter relative to the font size.
pub const HALO_SCALE: f64 = 2.4;
/// Extra halo size for the anchor word of a phrase.
pub const ANCHOR_HALO_BOOST: f64 = 1.6;
/// Font weight at and above which text gets a faux-bold second pass.
pub const FAUX_BOLD_WEIGHT: u16 = 700;

// Emotional events.
/// Song-progress tolerance for firing an event.
pub const EVENT_TOLERANCE: f64 = 0.012;
/// Light break duration (s).
pub const LIGHT_BREAK_SEC: f64 = 2.4;
/// World shift duration (s).
pub const WORLD_SHIFT_SEC: f64 = 4.0;
/// Lens breath duration (s).
pub const LENS_BREATH_SEC: f64 = 3.2;
/// Void moment duration (s).
pub const VOID_MOMENT_SEC: f64 = 1.8;
/// Halo ring duration (s).
pub const HALO_RING_SEC: f64 = 2.8;
/// Song progress of the early lens breath.
pub const LENS_BREATH_RATIO: f64 = 0.08;
/// Song progress of the late halo ring.
pub const HALO_RING_RATIO: f64 = 0.92;

// Playback.
/// Backward jump of the audio clock (s) between frames that counts as a loop wrap.
pub const LOOP_WRAP_BACKSTEP_SEC: f64 = 0.5;

// Ephemerals.
/// Grace period after an ephemeral's duration before it is pruned (ms).
pub const EPHEMERAL_GRACE_MS: f64 = 250.0;
/// Duration of short emitters (s).
pub const EMITTER_SHORT_SEC: f64 = 0.9;
/// Duration of medium emitters (s).
pub const EMITTER_MEDIUM_SEC: f64 = 1.4;
/// Duration of long emitters (s).
pub const EMITTER_LONG_SEC: f64 = 2.2;
/// Downward acceleration of coin particles (px/s^2).
pub const COIN_GRAVITY: f64 = 400.0;
/// Live emitter cap.
pub const MAX_EMITTERS: usize = 48;
/// Live comet cap.
pub const MAX_COMETS: usize = 8;
/// Comet flight time (s).
pub const COMET_SEC: f64 = 4.5;
/// Peak comet opacity.
pub const COMET_PEAK_OPACITY: f64 = 0.65;
/// Off-screen start/end margin of a comet (px).
pub const COMET_MARGIN: f64 = 160.0;
/// Comet trail length (px).
pub const COMET_TRAIL_PX: f64 = 120.0;
/// Comet text size (px).
pub const COMET_FONT_PX: f64 = 22.0;

// Watermark.
/// Watermark text size (px).
pub const WATERMARK_FONT_PX: f64 = 14.0;
/// Watermark opacity.
pub const WATERMARK_OPACITY: f64 = 0.55;
