use crate::chunks::cache::ChunkCache;
use crate::compositor::chapters::ChapterSet;
use crate::compositor::covers::CoverLibrary;
use crate::compositor::sprites::{Sprite, sprite_from_premul};
use crate::events::overlay::draw_event;
use crate::events::{EventScheduler, derive_events};
use crate::foundation::core::{LogicalSize, Point, Rect};
use crate::foundation::error::DanceResult;
use crate::player::metrics::{FrameMetrics, Layer};
use crate::render::comets::CometOverlay;
use crate::render::emitters::EmitterField;
use crate::render::painter::Painter;
use crate::render::words::{WordPass, WordRenderer};
use crate::scene::color::Color;
use crate::scene::model::SceneInput;
use crate::sim::{SimKind, SimulatorSet};
use crate::text::shaper::TextShaper;
use crate::timeline::keyframe::BakedKeyframe;
use crate::tuning;

/// Knobs the composer is built with.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposerSettings {
    /// Seed for simulators.
    pub seed: u64,
    /// Simulation step rate cap.
    pub sim_fps: f64,
    /// Event trigger tolerance in progress ratio.
    pub event_tolerance: f64,
    /// Corner badge text.
    pub watermark: Option<String>,
}

/// Per-frame inputs.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput<'a> {
    /// Scene being played.
    pub scene: &'a SceneInput,
    /// Keyframe at the audio time, already scaled to `size`.
    pub keyframe: Option<&'a BakedKeyframe>,
    /// Chunk visuals for the words pass.
    pub chunks: &'a ChunkCache,
    /// Audio time (s).
    pub time_sec: f64,
    /// Host clock (ms) for ephemeral effects.
    pub now_ms: f64,
    /// Logical surface size.
    pub size: LogicalSize,
    /// Device pixel ratio.
    pub dpr: f64,
    /// Factor from baked sizes (fonts, particle radii) to `size`.
    pub size_scale: f64,
}

/// Owns every per-instance drawing system and paints frames in a fixed layer order.
#[derive(Debug)]
pub struct FrameComposer {
    settings: ComposerSettings,
    chapters: ChapterSet,
    covers: CoverLibrary,
    sims: SimulatorSet,
    events: EventScheduler,
    words: WordRenderer,
    emitters: EmitterField,
    sim_sprite: Option<(SimKind, u64, Sprite)>,
}

impl FrameComposer {
    /// Build chapter caches, covers, simulators and the event schedule for `scene`.
    #[tracing::instrument(skip_all, fields(scene = %scene.scene_id))]
    pub fn build(scene: &SceneInput, size: LogicalSize, settings: ComposerSettings) -> DanceResult<Self> {
        let chapters = ChapterSet::build(scene, size)?;
        let mut covers = CoverLibrary::new();
        covers.load(&scene.chapter_images);
        covers.rebuild_vignette(pixel_extent(size.width), pixel_extent(size.height))?;
        let sims = build_sims(scene, &chapters, &settings);
        let events = EventScheduler::new(
            derive_events(scene.cinematic_direction.as_ref()),
            settings.event_tolerance,
        );
        tracing::debug!(
            chapters = chapters.len(),
            synthetic = chapters.is_synthetic(),
            covers = covers.has_any(),
            sims = ?sims.kinds(),
            events = events.events().len(),
            "frame composer ready"
        );
        Ok(Self {
            settings,
            chapters,
            covers,
            sims,
            events,
            words: WordRenderer::new(),
            emitters: EmitterField::default(),
            sim_sprite: None,
        })
    }

    /// Rebuild size-dependent caches. Simulators and events keep their state.
    pub fn resize(&mut self, scene: &SceneInput, size: LogicalSize) -> DanceResult<()> {
        self.chapters = ChapterSet::build(scene, size)?;
        self.covers
            .rebuild_vignette(pixel_extent(size.width), pixel_extent(size.height))
    }

    /// Rebuild everything derived from the cinematic direction. Word emitters survive.
    pub fn rebuild_for_direction(&mut self, scene: &SceneInput, size: LogicalSize) -> DanceResult<()> {
        self.chapters = ChapterSet::build(scene, size)?;
        self.covers.load(&scene.chapter_images);
        self.sims = build_sims(scene, &self.chapters, &self.settings);
        self.sim_sprite = None;
        self.events = EventScheduler::new(
            derive_events(scene.cinematic_direction.as_ref()),
            self.settings.event_tolerance,
        );
        Ok(())
    }

    /// Forget which chunks already spawned emitters, so a replayed section spawns again.
    pub fn clear_fired(&mut self) {
        self.words.clear_fired();
    }

    /// Start a new pass over the song: word emitters and emotional events can fire again.
    pub fn rearm_pass(&mut self) {
        self.words.clear_fired();
        self.events.rearm();
    }

    /// Chapter backgrounds.
    pub fn chapters(&self) -> &ChapterSet {
        &self.chapters
    }

    /// Event schedule.
    pub fn events(&self) -> &EventScheduler {
        &self.events
    }

    /// Word renderer state.
    pub fn words(&self) -> &WordRenderer {
        &self.words
    }

    /// Live word emitters.
    pub fn emitters(&self) -> &EmitterField {
        &self.emitters
    }

    /// Simulators.
    pub fn sims(&self) -> &SimulatorSet {
        &self.sims
    }

    /// Paint one frame.
    ///
    /// Order: clear, chapter background, covers, simulation, lighting pulse, events, words,
    /// particles, comets, emitters, watermark. Layers drawn are appended to `metrics.layers`.
    pub fn compose(
        &mut self,
        painter: &mut Painter<'_>,
        input: FrameInput<'_>,
        shaper: &mut TextShaper,
        comets: &mut CometOverlay,
        metrics: &mut FrameMetrics,
    ) -> DanceResult<()> {
        let scene = input.scene;
        let rect = input.size.rect();
        let accent = scene.accent();
        let ratio = scene.progress_ratio(input.time_sec);
        let intensity = scene.physics.intensity;

        painter.fill_rect(rect, Color::BLACK, 1.0);
        metrics.push(Layer::Clear);

        let kf = input.keyframe;
        let blend = self.chapters.blend_at(kf.map_or(0.0, |k| k.bg_blend));
        metrics.chapter = blend.current;

        let pulse = scene.beat_grid.pulse_at(
            input.time_sec,
            kf.and_then(|k| k.beat_index),
            tuning::BEAT_PULSE_DECAY,
        );
        let active_sim = self.chapters.sim_for(blend);
        metrics.sim_stepped = self.sims.advance(active_sim, input.time_sec, pulse, intensity);
        metrics.sim_steps = self.sims.steps();

        self.chapters.draw(painter, blend, rect);
        metrics.push(Layer::Background);

        if self.covers.draw(painter, blend, rect) {
            metrics.push(Layer::Covers);
        }

        if self.draw_sim(painter, active_sim, rect)? {
            metrics.sim = Some(active_sim);
            metrics.push(Layer::Simulation);
        }

        let tension = scene
            .cinematic_direction
            .as_ref()
            .map_or(0.0, |d| d.tension_at(ratio));
        let light = tuning::LIGHTING_PULSE_OPACITY * pulse * (0.5 + 0.5 * tension);
        if light > 0.0 {
            painter.fill_rect(rect, accent, light);
            metrics.push(Layer::Lighting);
        }

        self.events.update(ratio, input.now_ms);
        metrics.active_events = self.events.active().len();
        metrics.events_fired = self.events.fired_total();
        if !self.events.active().is_empty() {
            for ev in self.events.active() {
                draw_event(painter, ev, input.now_ms, input.size, accent);
            }
            metrics.push(Layer::Events);
        }

        if let Some(frame) = kf {
            let pass = WordPass {
                size: input.size,
                dpr: input.dpr,
                accent,
                intensity,
                now_ms: input.now_ms,
                size_scale: input.size_scale,
            };
            metrics.words =
                self.words
                    .draw(painter, frame, input.chunks, shaper, &mut self.emitters, pass)?;
            metrics.push(Layer::Words);

            if !frame.particles.is_empty() {
                for p in &frame.particles {
                    if p.alpha <= 0.0 || p.size <= 0.0 {
                        continue;
                    }
                    let radius = p.size * input.size_scale;
                    painter.fill_circle(Point::new(p.x, p.y), radius, p.color.unwrap_or(accent), p.alpha);
                }
                metrics.push(Layer::Particles);
            }
        }
        metrics.missing_total = self.words.missing_total();

        comets.prune(input.now_ms);
        metrics.comets = comets.len();
        if !comets.is_empty() {
            comets.draw(painter, input.now_ms, input.size, accent, shaper);
            metrics.push(Layer::Comets);
        }

        self.emitters.prune(input.now_ms);
        metrics.emitters = self.emitters.len();
        if !self.emitters.is_empty() {
            self.emitters.draw(painter, input.now_ms);
            metrics.push(Layer::Emitters);
        }

        if let Some(text) = self.settings.watermark.as_deref()
            && !text.trim().is_empty()
        {
            draw_watermark(painter, text, input.size, shaper);
            metrics.push(Layer::Watermark);
        }
        Ok(())
    }

    fn draw_sim(&mut self, painter: &mut Painter<'_>, kind: SimKind, rect: Rect) -> DanceResult<bool> {
        let Some(frame) = self.sims.frame(kind) else {
            return Ok(false);
        };
        if frame.generation == 0 {
            return Ok(false);
        }
        let stale = !matches!(&self.sim_sprite, Some((k, g, _)) if *k == kind && *g == frame.generation);
        if stale {
            let sprite = sprite_from_premul(&frame.rgba_premul, frame.width, frame.height)?;
            self.sim_sprite = Some((kind, frame.generation, sprite));
        }
        if let Some((_, _, sprite)) = &self.sim_sprite {
            painter.draw_image(
                &sprite.image,
                sprite.size(),
                rect,
                f64::from(tuning::SIM_LAYER_OPACITY),
            );
        }
        Ok(true)
    }
}

fn build_sims(scene: &SceneInput, chapters: &ChapterSet, settings: &ComposerSettings) -> SimulatorSet {
    let kinds = (0..chapters.len())
        .filter_map(|i| chapters.get(i).map(|c| c.sim))
        .chain(std::iter::once(SimKind::from_directive(&scene.physics.system)));
    SimulatorSet::new(
        kinds,
        scene.dominant(),
        scene.accent(),
        settings.seed,
        settings.sim_fps,
    )
}

fn pixel_extent(v: f64) -> u32 {
    if v.is_finite() { v.round().max(1.0) as u32 } else { 1 }
}

fn draw_watermark(painter: &mut Painter<'_>, text: &str, size: LogicalSize, shaper: &mut TextShaper) {
    let pad = 12.0;
    let font_px = tuning::WATERMARK_FONT_PX;
    let width = shaper
        .shape(text, font_px)
        .map_or(text.chars().count() as f64 * font_px * 0.55, |s| s.width);
    let badge = Rect::new(
        size.width - width - pad * 3.0,
        size.height - font_px - pad * 3.0,
        size.width - pad,
        size.height - pad,
    );
    painter.fill_rect(badge, Color::BLACK, tuning::WATERMARK_OPACITY * 0.6);
    let origin = Point::new(badge.x0 + pad, badge.y1 - pad);
    match (shaper.shape(text, font_px), shaper.fonts().font_data()) {
        (Ok(shaped), Some(font)) => {
            painter.draw_text(font, &shaped, origin, Color::WHITE, tuning::WATERMARK_OPACITY);
        }
        _ => {
            let bar = Rect::new(origin.x, origin.y - 2.0, origin.x + width, origin.y);
            painter.fill_rect(bar, Color::WHITE, tuning::WATERMARK_OPACITY);
        }
    }
}
