use crate::compositor::sprites::{Sprite, sprite_from_premul, vertical_gradient_bytes};
use crate::foundation::core::{LogicalSize, Rect};
use crate::foundation::error::DanceResult;
use crate::render::painter::Painter;
use crate::scene::color::Color;
use crate::scene::model::SceneInput;
use crate::sim::SimKind;
use crate::tuning;

/// Pre-rendered background for one chapter.
#[derive(Clone, Debug)]
pub struct ChapterCache {
    /// Chapter title (`default` for the synthetic chapter).
    pub title: String,
    /// Tint the tile was rendered from.
    pub tint: Color,
    /// Background tile sized to the surface.
    pub tile: Sprite,
    /// Simulation system the chapter asks for.
    pub sim: SimKind,
    /// Emotional intensity in `0..1`.
    pub intensity: f64,
}

/// Current/next chapter and the crossfade between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChapterBlend {
    /// Chapter drawn at full opacity.
    pub current: usize,
    /// Chapter faded in on top.
    pub next: usize,
    /// Opacity of `next` in `0..1`.
    pub frac: f64,
}

/// All chapter backgrounds for the current surface size.
#[derive(Clone, Debug)]
pub struct ChapterSet {
    chapters: Vec<ChapterCache>,
    synthetic: bool,
    tile_size: (u32, u32),
}

impl ChapterSet {
    /// Build one cache per direction chapter, or a single near-black default.
    #[tracing::instrument(skip_all, fields(w = size.width, h = size.height))]
    pub fn build(scene: &SceneInput, size: LogicalSize) -> DanceResult<Self> {
        let tile_size = tile_size(size);
        let scene_sim = SimKind::from_directive(&scene.physics.system);
        let chapters = scene
            .cinematic_direction
            .as_ref()
            .map(|d| d.chapters.as_slice())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(chapters.len().max(1));
        for (i, ch) in chapters.iter().enumerate() {
            let tint = ch.dominant_color.unwrap_or_else(|| scene.palette_color(i));
            let directive = match &ch.atmosphere {
                Some(a) => format!("{a} {}", ch.background),
                None => ch.background.clone(),
            };
            let sim = match SimKind::from_directive(&directive) {
                SimKind::None => scene_sim,
                k => k,
            };
            out.push(ChapterCache {
                title: ch.title.clone(),
                tint,
                tile: render_tile(tint, tuning::CHAPTER_TILE_TOP, tile_size)?,
                sim,
                intensity: ch.emotional_intensity.clamp(0.0, 1.0),
            });
        }

        let synthetic = out.is_empty();
        if synthetic {
            let tint = scene.dominant();
            out.push(ChapterCache {
                title: "default".to_owned(),
                tint,
                tile: render_tile(tint, tuning::DEFAULT_TILE_TOP, tile_size)?,
                sim: scene_sim,
                intensity: scene.physics.intensity.clamp(0.0, 1.0),
            });
        }
        tracing::debug!(chapters = out.len(), synthetic, "chapter caches built");

        Ok(Self {
            chapters: out,
            synthetic,
            tile_size,
        })
    }

    /// Number of chapter caches (at least one).
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// Always `false`; a set holds at least the default chapter.
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Whether this is the synthetic single-chapter fallback.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Chapter cache by index.
    pub fn get(&self, i: usize) -> Option<&ChapterCache> {
        self.chapters.get(i)
    }

    /// Pixel size of every tile.
    pub fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    /// Resolve a keyframe's `bg_blend` into chapter indices and a crossfade.
    pub fn blend_at(&self, bg_blend: f64) -> ChapterBlend {
        let last = self.chapters.len().saturating_sub(1);
        let b = if bg_blend.is_finite() {
            bg_blend.clamp(0.0, last as f64)
        } else {
            0.0
        };
        let current = (b.floor() as usize).min(last);
        let next = (current + 1).min(last);
        let frac = if next == current {
            0.0
        } else {
            b - current as f64
        };
        ChapterBlend {
            current,
            next,
            frac,
        }
    }

    /// Simulation system of the chapter dominating `blend`.
    pub fn sim_for(&self, blend: ChapterBlend) -> SimKind {
        let i = if blend.frac >= 0.5 {
            blend.next
        } else {
            blend.current
        };
        self.chapters.get(i).map_or(SimKind::None, |c| c.sim)
    }

    /// Draw the current tile, then the next tile at `frac` for the crossfade.
    pub fn draw(&self, painter: &mut Painter<'_>, blend: ChapterBlend, rect: Rect) {
        if let Some(cur) = self.chapters.get(blend.current) {
            painter.draw_image(&cur.tile.image, cur.tile.size(), rect, 1.0);
        }
        if blend.frac > 0.0
            && let Some(next) = self.chapters.get(blend.next)
        {
            painter.draw_image(&next.tile.image, next.tile.size(), rect, blend.frac);
        }
    }
}

fn tile_size(size: LogicalSize) -> (u32, u32) {
    let max = f64::from(tuning::CHAPTER_TILE_MAX_PX);
    let w = size.width.round().clamp(1.0, max) as u32;
    let h = size.height.round().clamp(1.0, max) as u32;
    (w, h)
}

fn render_tile(tint: Color, top_level: f64, (w, h): (u32, u32)) -> DanceResult<Sprite> {
    let top = Color::BLACK.mix(tint, top_level);
    let bottom = Color::BLACK.mix(tint, top_level * 0.3);
    sprite_from_premul(&vertical_gradient_bytes(w, h, top, bottom), w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::model::{Chapter, CinematicDirection};

    fn scene(chapters: usize) -> SceneInput {
        let mut s = SceneInput::from_json(
            r##"{"scene_id": "c", "song": {"artist": "a", "title": "t"},
                 "physics": {"system": "rain"},
                 "palette": ["#ff0000", "#00ff00"],
                 "song_start": 0, "song_end": 60}"##,
        )
        .unwrap();
        if chapters > 0 {
            s.cinematic_direction = Some(CinematicDirection {
                chapters: (0..chapters)
                    .map(|i| Chapter {
                        title: format!("ch{i}"),
                        start_ratio: i as f64 / chapters as f64,
                        end_ratio: (i + 1) as f64 / chapters as f64,
                        background: if i == 1 { "ocean".into() } else { "city".into() },
                        atmosphere: None,
                        emotional_intensity: 0.5,
                        dominant_color: None,
                    })
                    .collect(),
                ..Default::default()
            });
        }
        s
    }

    #[test]
    fn no_direction_yields_one_dark_default() {
        let set = ChapterSet::build(&scene(0), LogicalSize::new(64.0, 36.0)).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.is_synthetic());
        let c = set.get(0).unwrap();
        let top = Color::BLACK.mix(c.tint, tuning::DEFAULT_TILE_TOP);
        assert!(top.luminance() < 0.1);
        assert_eq!(c.sim, SimKind::Rain);
    }

    #[test]
    fn blend_splits_integer_and_fraction() {
        let set = ChapterSet::build(&scene(3), LogicalSize::new(32.0, 32.0)).unwrap();
        assert_eq!(
            set.blend_at(1.25),
            ChapterBlend {
                current: 1,
                next: 2,
                frac: 0.25
            }
        );
        assert_eq!(set.blend_at(7.0).current, 2);
        assert_eq!(set.blend_at(7.0).frac, 0.0);
        assert_eq!(set.blend_at(-3.0).current, 0);
        assert_eq!(set.blend_at(f64::NAN).current, 0);
    }

    #[test]
    fn chapter_sim_falls_back_to_scene_system() {
        let set = ChapterSet::build(&scene(3), LogicalSize::new(32.0, 32.0)).unwrap();
        assert_eq!(set.get(0).unwrap().sim, SimKind::Rain);
        assert_eq!(set.get(1).unwrap().sim, SimKind::Water);
        assert_eq!(set.sim_for(set.blend_at(0.6)), SimKind::Water);
    }

    #[test]
    fn tiles_follow_surface_size() {
        let set = ChapterSet::build(&scene(2), LogicalSize::new(40.0, 30.0)).unwrap();
        assert_eq!(set.tile_size(), (40, 30));
        assert_eq!(set.get(1).unwrap().tile.size(), (40, 30));
    }
}
