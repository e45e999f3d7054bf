use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{DanceError, DanceResult};
use crate::scene::color::Color;

/// Everything the engine knows about one song render session.
///
/// Immutable for the lifetime of a player except through
/// [`crate::LyricDancePlayer::update_cinematic_direction`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneInput {
    /// Stable scene identity (feeds the session key).
    pub scene_id: String,
    /// Song metadata.
    pub song: SongMeta,
    /// Lyric lines in playback order.
    #[serde(default)]
    pub lines: Vec<LyricLine>,
    /// Word-level timing in playback order.
    #[serde(default)]
    pub words: Vec<WordTiming>,
    /// Beat grid used for pulses.
    #[serde(default)]
    pub beat_grid: BeatGrid,
    /// Physics / look parameters.
    #[serde(default)]
    pub physics: PhysicsSpec,
    /// Palette; the first entry is the dominant color, the second the accent.
    #[serde(default)]
    pub palette: Vec<Color>,
    /// Optional cinematic direction (chapters, tension, climax).
    #[serde(default)]
    pub cinematic_direction: Option<CinematicDirection>,
    /// Optional per-chapter cover images, indexed like the chapters.
    #[serde(default)]
    pub chapter_images: Vec<PathBuf>,
    /// Playback window start in seconds (audio time).
    pub song_start: f64,
    /// Playback window end in seconds (audio time).
    pub song_end: f64,
}

/// Song metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SongMeta {
    /// Artist name.
    pub artist: String,
    /// Song title.
    pub title: String,
    /// Audio file used for playback and as the export soundtrack.
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
}

/// One lyric line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LyricLine {
    /// Line text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

/// One timed word.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordTiming {
    /// Word text as displayed.
    pub word: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

/// Beat grid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Tempo in beats per minute.
    #[serde(default)]
    pub bpm: f64,
    /// Beat times in seconds, ascending.
    #[serde(default)]
    pub beats: Vec<f64>,
}

impl BeatGrid {
    /// Decaying pulse in `[0, 1]` for `time_sec`, peaking on each beat.
    ///
    /// `beat_index` is the keyframe's baked beat index when available; otherwise the latest beat
    /// at or before `time_sec` is located by binary search.
    pub fn pulse_at(&self, time_sec: f64, beat_index: Option<u32>, decay: f64) -> f64 {
        let idx = match beat_index {
            Some(i) if (i as usize) < self.beats.len() => i as usize,
            _ => {
                let n = self.beats.partition_point(|b| *b <= time_sec);
                if n == 0 {
                    return 0.0;
                }
                n - 1
            }
        };
        let since = time_sec - self.beats[idx];
        if since < 0.0 {
            return 0.0;
        }
        (-since * decay).exp()
    }
}

/// Look parameters the baker and simulators share.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhysicsSpec {
    /// Background simulation system (`fire`, `ember`, `smoke`, `water`, `aurora`, `rain`, `none`).
    #[serde(default = "default_system")]
    pub system: String,
    /// Global effect intensity in `0..1`.
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    /// Base font size in logical pixels used for chunk measurement.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Base font weight.
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
}

fn default_system() -> String {
    "none".to_owned()
}

fn default_intensity() -> f64 {
    0.6
}

fn default_font_size() -> f64 {
    48.0
}

fn default_font_weight() -> u16 {
    600
}

impl Default for PhysicsSpec {
    fn default() -> Self {
        Self {
            system: default_system(),
            intensity: default_intensity(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
        }
    }
}

/// Optional cinematic direction produced upstream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CinematicDirection {
    /// Chapters in song order.
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Tension samples over song progress.
    #[serde(default)]
    pub tension_curve: Vec<TensionPoint>,
    /// The song's climax.
    #[serde(default)]
    pub climax: Option<Climax>,
}

impl CinematicDirection {
    /// Index of the chapter with the highest emotional intensity (first on ties).
    pub fn most_intense_chapter(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.chapters.iter().enumerate() {
            match best {
                Some((_, v)) if c.emotional_intensity <= v => {}
                _ => best = Some((i, c.emotional_intensity)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Tension at song progress `ratio`, linearly interpolated between curve samples.
    ///
    /// An empty curve reads as `0`; ratios outside the samples clamp to the end values.
    pub fn tension_at(&self, ratio: f64) -> f64 {
        let curve = &self.tension_curve;
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return 0.0;
        };
        if ratio <= first.ratio {
            return first.tension.clamp(0.0, 1.0);
        }
        if ratio >= last.ratio {
            return last.tension.clamp(0.0, 1.0);
        }
        for w in curve.windows(2) {
            let (a, b) = (w[0], w[1]);
            if ratio >= a.ratio && ratio <= b.ratio {
                let span = b.ratio - a.ratio;
                let t = if span > 0.0 { (ratio - a.ratio) / span } else { 1.0 };
                return (a.tension + (b.tension - a.tension) * t).clamp(0.0, 1.0);
            }
        }
        last.tension.clamp(0.0, 1.0)
    }
}

/// One chapter of the cinematic direction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chapter {
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Song-progress ratio where the chapter starts.
    pub start_ratio: f64,
    /// Song-progress ratio where the chapter ends.
    pub end_ratio: f64,
    /// Background directive (free text; keywords select the simulator).
    #[serde(default)]
    pub background: String,
    /// Optional atmosphere directive.
    #[serde(default)]
    pub atmosphere: Option<String>,
    /// Emotional intensity in `0..1`.
    #[serde(default)]
    pub emotional_intensity: f64,
    /// Optional dominant color for the chapter tint.
    #[serde(default)]
    pub dominant_color: Option<Color>,
}

/// One sample of the tension curve.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TensionPoint {
    /// Song-progress ratio.
    pub ratio: f64,
    /// Tension in `0..1`.
    pub tension: f64,
}

/// The song's climax.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Climax {
    /// Song-progress ratio of the climax.
    pub time_ratio: f64,
    /// Peak intensity in `0..1`.
    #[serde(default = "default_climax_intensity")]
    pub max_intensity: f64,
}

fn default_climax_intensity() -> f64 {
    1.0
}

/// Shared-bake invalidation key: scene identity plus word count.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Build the key for a scene id and word count.
    pub fn new(scene_id: &str, word_count: usize) -> Self {
        Self(format!("{scene_id}:{word_count}"))
    }

    /// Borrow the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

const DEFAULT_DOMINANT: Color = Color::rgb(0.55, 0.42, 0.95);
const DEFAULT_ACCENT: Color = Color::rgb(1.0, 0.72, 0.38);

impl SceneInput {
    /// Parse a scene from JSON.
    pub fn from_json(s: &str) -> DanceResult<Self> {
        serde_json::from_str(s).map_err(|e| DanceError::validation(format!("scene json: {e}")))
    }

    /// Validate invariants the engine relies on.
    pub fn validate(&self) -> DanceResult<()> {
        if self.scene_id.trim().is_empty() {
            return Err(DanceError::validation("scene_id must be non-empty"));
        }
        if !self.song_start.is_finite() || !self.song_end.is_finite() {
            return Err(DanceError::validation("song bounds must be finite"));
        }
        if self.song_start < 0.0 || self.song_end <= self.song_start {
            return Err(DanceError::validation(format!(
                "song bounds must satisfy 0 <= start < end, got [{}, {}]",
                self.song_start, self.song_end
            )));
        }
        for (i, w) in self.words.iter().enumerate() {
            if !w.start.is_finite() || !w.end.is_finite() {
                return Err(DanceError::validation(format!(
                    "word {i} has non-finite timing"
                )));
            }
        }
        for (i, l) in self.lines.iter().enumerate() {
            if !l.start.is_finite() || !l.end.is_finite() || l.end < l.start {
                return Err(DanceError::validation(format!(
                    "line {i} timing must be finite with end >= start"
                )));
            }
        }
        if let Some(dir) = &self.cinematic_direction {
            for (i, c) in dir.chapters.iter().enumerate() {
                if !(c.start_ratio.is_finite() && c.end_ratio.is_finite()) {
                    return Err(DanceError::validation(format!(
                        "chapter {i} ratios must be finite"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Shared-bake key for this scene.
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.scene_id, self.words.len())
    }

    /// Playback window length in seconds.
    pub fn duration(&self) -> f64 {
        (self.song_end - self.song_start).max(0.0)
    }

    /// Clamp an audio time into the playback window.
    pub fn clamp_time(&self, time_sec: f64) -> f64 {
        if time_sec.is_nan() {
            return self.song_start;
        }
        time_sec.clamp(self.song_start, self.song_end)
    }

    /// Song progress in `[0, 1]` for an audio time.
    pub fn progress_ratio(&self, time_sec: f64) -> f64 {
        let d = self.duration();
        if d <= 0.0 {
            return 0.0;
        }
        ((self.clamp_time(time_sec) - self.song_start) / d).clamp(0.0, 1.0)
    }

    /// Palette entry `i`, falling back to built-in colors.
    pub fn palette_color(&self, i: usize) -> Color {
        if self.palette.is_empty() {
            return if i % 2 == 0 {
                DEFAULT_DOMINANT
            } else {
                DEFAULT_ACCENT
            };
        }
        self.palette[i % self.palette.len()]
    }

    /// Dominant palette color.
    pub fn dominant(&self) -> Color {
        self.palette_color(0)
    }

    /// Accent palette color.
    pub fn accent(&self) -> Color {
        if self.palette.len() == 1 {
            return DEFAULT_ACCENT;
        }
        self.palette_color(1)
    }

    /// Whether cinematic direction is present.
    pub fn has_direction(&self) -> bool {
        self.cinematic_direction.is_some()
    }
}
