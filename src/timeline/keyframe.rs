use serde::{Deserialize, Serialize};

use crate::chunks::key::ChunkKey;
use crate::scene::color::Color;

/// A pre-computed snapshot of all visual state at one song time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakedKeyframe {
    /// Song time in milliseconds (audio time).
    pub time_ms: f64,
    /// Index into the scene beat grid, if the baker resolved one.
    #[serde(default)]
    pub beat_index: Option<u32>,
    /// Camera offset x (logical px).
    #[serde(default)]
    pub camera_x: f64,
    /// Camera offset y (logical px).
    #[serde(default)]
    pub camera_y: f64,
    /// Camera zoom around the surface center.
    #[serde(default = "one")]
    pub camera_zoom: f64,
    /// Continuous chapter position; integer part = chapter, fraction = crossfade to next.
    #[serde(default)]
    pub bg_blend: f64,
    /// Floating particles (screen space).
    #[serde(default)]
    pub particles: Vec<BakedParticle>,
    /// Per-chunk transforms.
    #[serde(default)]
    pub chunks: Vec<BakedChunk>,
}

/// One floating particle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakedParticle {
    /// X position (logical px).
    pub x: f64,
    /// Y position (logical px).
    pub y: f64,
    /// Radius (logical px).
    #[serde(default = "one")]
    pub size: f64,
    /// Opacity.
    #[serde(default = "one")]
    pub alpha: f64,
    /// Optional color; defaults to the accent color.
    #[serde(default)]
    pub color: Option<Color>,
}

/// Baked transform of one chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakedChunk {
    /// Identity; must exist in the chunk cache.
    pub key: ChunkKey,
    /// Center x (logical px, pre-camera).
    pub x: f64,
    /// Baseline-center y (logical px, pre-camera).
    pub y: f64,
    /// Horizontal scale.
    #[serde(default = "one")]
    pub scale_x: f64,
    /// Vertical scale.
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Horizontal skew (tangent).
    #[serde(default)]
    pub skew_x: f64,
    /// Opacity.
    #[serde(default = "one")]
    pub alpha: f64,
    /// Glow intensity in `0..1`.
    #[serde(default)]
    pub glow: f64,
    /// Font size (logical px).
    pub font_size: f64,
    /// Font weight.
    #[serde(default = "default_weight")]
    pub font_weight: u16,
    /// Whether the chunk is drawn this frame.
    #[serde(default)]
    pub visible: bool,
    /// Anchor word of its phrase (bigger halo).
    #[serde(default)]
    pub is_anchor: bool,
    /// Text color; defaults to white.
    #[serde(default)]
    pub color: Option<Color>,
    /// Optional icon decoration.
    #[serde(default)]
    pub icon: Option<IconDecoration>,
    /// One-shot emitter spawned the first time this chunk is drawn.
    #[serde(default)]
    pub emitter: EmitterKind,
}

/// Icon drawn with a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IconDecoration {
    /// Which glyph.
    pub glyph: IconGlyph,
    /// Placement relative to the text.
    #[serde(default)]
    pub position: IconPosition,
    /// Size relative to the font size.
    #[serde(default = "one")]
    pub scale: f64,
    /// Opacity multiplier.
    #[serde(default = "default_icon_opacity")]
    pub opacity: f64,
}

/// Built-in icon glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconGlyph {
    /// Heart.
    Heart,
    /// Five-point star.
    Star,
    /// Flame.
    Flame,
    /// Eighth note.
    Note,
    /// Crescent moon.
    Moon,
    /// Water drop.
    Drop,
    /// Lightning bolt.
    Bolt,
}

/// Where an icon sits relative to its chunk text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconPosition {
    /// Large and faint behind the text.
    #[default]
    Behind,
    /// Small, above the text.
    Above,
    /// Small, to the right of the text.
    Beside,
    /// Drawn instead of the text.
    Replace,
}

impl IconPosition {
    /// Icons drawn before the text (pre-icon pass).
    pub fn is_pre(self) -> bool {
        matches!(self, Self::Behind | Self::Replace)
    }
}

/// One-shot particle emitter types a chunk can declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitterKind {
    /// No emitter.
    #[default]
    None,
    /// Embers drifting upward.
    Ember,
    /// Frost shards flying outward.
    Frost,
    /// Fast radial spark burst.
    Spark,
    /// Dust kicked sideways along the baseline.
    Dust,
    /// Light rays converging onto the word.
    LightRays,
    /// Expanding ring.
    Ring,
    /// Coins falling with gravity.
    Coins,
    /// Motes orbiting the word.
    Orbit,
    /// Horizontal motion trail.
    Trail,
    /// Particles converging from a wide circle.
    Converge,
    /// Darkness absorbing inward.
    DarkAbsorb,
    /// Twinkling glitter.
    Shimmer,
}

impl EmitterKind {
    /// All spawnable kinds.
    pub const ALL: [EmitterKind; 12] = [
        EmitterKind::Ember,
        EmitterKind::Frost,
        EmitterKind::Spark,
        EmitterKind::Dust,
        EmitterKind::LightRays,
        EmitterKind::Ring,
        EmitterKind::Coins,
        EmitterKind::Orbit,
        EmitterKind::Trail,
        EmitterKind::Converge,
        EmitterKind::DarkAbsorb,
        EmitterKind::Shimmer,
    ];
}

fn one() -> f64 {
    1.0
}

fn default_weight() -> u16 {
    400
}

fn default_icon_opacity() -> f64 {
    0.85
}
