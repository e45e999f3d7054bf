use std::collections::HashSet;

use crate::chunks::cache::ChunkCache;
use crate::chunks::key::ChunkKey;
use crate::compositor::sprites::HaloCache;
use crate::foundation::core::{Affine, LogicalSize, Point, Rect};
use crate::foundation::error::DanceResult;
use crate::foundation::math::clamp01;
use crate::render::emitters::EmitterField;
use crate::render::icons::IconAtlas;
use crate::render::painter::Painter;
use crate::scene::color::Color;
use crate::text::shaper::{ShapedText, TextShaper};
use crate::timeline::keyframe::{BakedChunk, BakedKeyframe, EmitterKind, IconDecoration, IconPosition};
use crate::tuning;

/// Per-frame inputs of the word pass.
#[derive(Clone, Copy, Debug)]
pub struct WordPass {
    /// Logical surface size.
    pub size: LogicalSize,
    /// Device pixel ratio (icon raster size).
    pub dpr: f64,
    /// Accent color for halos and glow.
    pub accent: Color,
    /// Effect intensity handed to spawned emitters.
    pub intensity: f64,
    /// Host time (ms) emitters are stamped with.
    pub now_ms: f64,
    /// Factor from baked font sizes to the current surface.
    pub size_scale: f64,
}

/// What the word pass did in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct WordStats {
    /// Chunks flagged visible.
    pub visible: u32,
    /// Chunks actually drawn.
    pub drawn: u32,
    /// Visible chunks whose key is absent from the chunk cache.
    pub missing: u32,
    /// Emitters spawned this frame.
    pub spawned: u32,
}

/// Camera transform of a keyframe: zoom around the surface center, then the baked offset.
pub fn camera_affine(frame: &BakedKeyframe, size: LogicalSize) -> Affine {
    let c = size.center();
    let zoom = if frame.camera_zoom.is_finite() && frame.camera_zoom > 0.0 {
        frame.camera_zoom
    } else {
        1.0
    };
    Affine::translate((c.x, c.y))
        * Affine::scale(zoom)
        * Affine::translate((-c.x, -c.y))
        * Affine::translate((frame.camera_x, frame.camera_y))
}

/// Draws visible chunks and fires their one-shot emitters.
#[derive(Debug, Default)]
pub struct WordRenderer {
    halos: HaloCache,
    icons: IconAtlas,
    fired: HashSet<ChunkKey>,
    missing_total: u64,
}

impl WordRenderer {
    /// Fresh renderer with nothing fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget which chunks already spawned their emitter.
    pub fn clear_fired(&mut self) {
        self.fired.clear();
    }

    /// Whether `key` already spawned its emitter.
    pub fn has_fired(&self, key: &ChunkKey) -> bool {
        self.fired.contains(key)
    }

    /// Number of chunks that spawned an emitter since the last clear.
    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }

    /// Missing-key lookups over the renderer's lifetime.
    pub fn missing_total(&self) -> u64 {
        self.missing_total
    }

    /// Draw every visible chunk of `frame` under its camera transform.
    ///
    /// Per chunk: halo, pre-icon, text, post-icon. Keys absent from `chunks` are skipped and
    /// counted.
    pub fn draw(
        &mut self,
        painter: &mut Painter<'_>,
        frame: &BakedKeyframe,
        chunks: &ChunkCache,
        shaper: &mut TextShaper,
        emitters: &mut EmitterField,
        pass: WordPass,
    ) -> DanceResult<WordStats> {
        let camera = camera_affine(frame, pass.size);
        let mut stats = WordStats::default();

        painter.save();
        painter.transform(camera);
        let result = self.draw_chunks(painter, frame, chunks, shaper, emitters, pass, camera, &mut stats);
        painter.restore();
        result?;

        self.missing_total += u64::from(stats.missing);
        if stats.missing > 0 {
            tracing::debug!(missing = stats.missing, "visible chunks without cache entries");
        }
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_chunks(
        &mut self,
        painter: &mut Painter<'_>,
        frame: &BakedKeyframe,
        chunks: &ChunkCache,
        shaper: &mut TextShaper,
        emitters: &mut EmitterField,
        pass: WordPass,
        camera: Affine,
        stats: &mut WordStats,
    ) -> DanceResult<()> {
        for c in frame.chunks.iter().filter(|c| c.visible) {
            stats.visible += 1;
            let Some(visual) = chunks.get(&c.key) else {
                stats.missing += 1;
                continue;
            };
            let resized;
            let c = if pass.size_scale != 1.0 && pass.size_scale.is_finite() && pass.size_scale > 0.0 {
                resized = BakedChunk {
                    font_size: c.font_size * pass.size_scale,
                    ..c.clone()
                };
                &resized
            } else {
                c
            };
            let alpha = clamp01(c.alpha);
            if alpha <= 0.0 || !c.font_size.is_finite() || c.font_size <= 0.0 {
                continue;
            }
            let color = c.color.unwrap_or(Color::WHITE);
            let shaped = shaper.shape(&visual.text, c.font_size)?;

            painter.save();
            painter.transform(chunk_affine(c));
            self.draw_halo(painter, c, shaped.width, color.mix(pass.accent, 0.5), alpha)?;
            if let Some(icon) = c.icon.filter(|i| i.position.is_pre()) {
                self.draw_icon(painter, c, &icon, shaped.width, color, alpha, pass.dpr)?;
            }
            let replaced = c.icon.is_some_and(|i| i.position == IconPosition::Replace);
            if !replaced {
                draw_chunk_text(painter, shaper, c, &shaped, color, pass.accent, alpha);
            }
            if let Some(icon) = c.icon.filter(|i| !i.position.is_pre()) {
                self.draw_icon(painter, c, &icon, shaped.width, color, alpha, pass.dpr)?;
            }
            painter.restore();
            stats.drawn += 1;

            if c.emitter != EmitterKind::None && self.fired.insert(c.key) {
                let origin = camera * Point::new(c.x, c.y - c.font_size * 0.35);
                emitters.spawn(c.emitter, origin, color.mix(pass.accent, 0.35), pass.intensity, pass.now_ms);
                stats.spawned += 1;
            }
        }
        Ok(())
    }

    fn draw_halo(
        &mut self,
        painter: &mut Painter<'_>,
        c: &BakedChunk,
        width: f64,
        tint: Color,
        alpha: f64,
    ) -> DanceResult<()> {
        let glow = clamp01(c.glow);
        let (boost, strength) = if c.is_anchor {
            (tuning::ANCHOR_HALO_BOOST, 0.55)
        } else {
            (1.0, 0.3)
        };
        let d = c.font_size * tuning::HALO_SCALE * boost * (0.6 + 0.4 * glow);
        let w = d.max(width * 1.3);
        let cy = -c.font_size * 0.35;
        let sprite = self.halos.get(tint)?;
        painter.draw_image(
            &sprite.image,
            sprite.size(),
            Rect::new(-w * 0.5, cy - d * 0.5, w * 0.5, cy + d * 0.5),
            alpha * strength * (0.5 + 0.5 * glow),
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_icon(
        &mut self,
        painter: &mut Painter<'_>,
        c: &BakedChunk,
        icon: &IconDecoration,
        text_width: f64,
        color: Color,
        alpha: f64,
        dpr: f64,
    ) -> DanceResult<()> {
        let fs = c.font_size;
        let scale = if icon.scale.is_finite() && icon.scale > 0.0 {
            icon.scale
        } else {
            1.0
        };
        let mid = -fs * 0.35;
        let (size, center, opacity) = match icon.position {
            IconPosition::Behind => (fs * 2.2 * scale, Point::new(0.0, mid), 0.35),
            IconPosition::Replace => (fs * 1.2 * scale, Point::new(0.0, mid), 1.0),
            IconPosition::Above => (fs * 0.6 * scale, Point::new(0.0, -fs * 1.25), 1.0),
            IconPosition::Beside => {
                let s = fs * 0.6 * scale;
                (s, Point::new(text_width * 0.5 + s * 0.7, mid), 1.0)
            }
        };
        let sprite = self.icons.get(icon.glyph, size * dpr.max(1.0), color)?;
        let half = size * 0.5;
        painter.draw_image(
            &sprite.image,
            sprite.size(),
            Rect::new(center.x - half, center.y - half, center.x + half, center.y + half),
            alpha * clamp01(icon.opacity) * opacity,
        );
        Ok(())
    }
}

fn chunk_affine(c: &BakedChunk) -> Affine {
    let sx = if c.scale_x.is_finite() { c.scale_x } else { 1.0 };
    let sy = if c.scale_y.is_finite() { c.scale_y } else { 1.0 };
    let skew = if c.skew_x.is_finite() { c.skew_x } else { 0.0 };
    Affine::translate((c.x, c.y)) * Affine::skew(skew, 0.0) * Affine::scale_non_uniform(sx, sy)
}

fn draw_chunk_text(
    painter: &mut Painter<'_>,
    shaper: &TextShaper,
    c: &BakedChunk,
    shaped: &ShapedText,
    color: Color,
    accent: Color,
    alpha: f64,
) {
    let origin = Point::new(-shaped.width * 0.5, 0.0);
    let Some(font) = shaper.fonts().font_data() else {
        // No font: a baseline bar marks where the word sits.
        let t = (c.font_size * 0.08).max(1.0);
        painter.fill_rect(
            Rect::new(origin.x, -t, origin.x + shaped.width, 0.0),
            color,
            alpha,
        );
        return;
    };

    let glow = clamp01(c.glow);
    if glow > 0.0 {
        for (dx, dy) in [(-1.5, 0.0), (1.5, 0.0), (0.0, -1.5), (0.0, 1.5)] {
            painter.draw_text(
                font,
                shaped,
                Point::new(origin.x + dx, origin.y + dy),
                accent,
                alpha * glow * 0.35,
            );
        }
    }
    painter.draw_text(font, shaped, origin, color, alpha);
    if c.font_weight >= tuning::FAUX_BOLD_WEIGHT {
        painter.draw_text(font, shaped, Point::new(origin.x + 0.6, origin.y), color, alpha);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::chunks::cache::ApproxMeasure;
    use crate::text::fonts::FontBook;

    fn chunk(key: ChunkKey, emitter: EmitterKind) -> BakedChunk {
        BakedChunk {
            key,
            x: 32.0,
            y: 40.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            alpha: 1.0,
            glow: 0.5,
            font_size: 16.0,
            font_weight: 400,
            visible: true,
            is_anchor: false,
            color: None,
            icon: None,
            emitter,
        }
    }

    fn frame(chunks: Vec<BakedChunk>) -> BakedKeyframe {
        BakedKeyframe {
            time_ms: 0.0,
            beat_index: None,
            camera_x: 0.0,
            camera_y: 0.0,
            camera_zoom: 1.0,
            bg_blend: 0.0,
            particles: Vec::new(),
            chunks,
        }
    }

    fn cache(keys: &[ChunkKey]) -> ChunkCache {
        let mut c = ChunkCache::default();
        let texts: BTreeMap<ChunkKey, String> = keys.iter().map(|k| (*k, "word".to_owned())).collect();
        c.merge_missing(&texts, 16.0, 400, &mut ApproxMeasure);
        c
    }

    fn pass() -> WordPass {
        WordPass {
            size: LogicalSize::new(64.0, 64.0),
            dpr: 1.0,
            accent: Color::rgb(1.0, 0.5, 0.2),
            intensity: 0.8,
            now_ms: 0.0,
            size_scale: 1.0,
        }
    }

    fn run(
        r: &mut WordRenderer,
        f: &BakedKeyframe,
        cache: &ChunkCache,
        emitters: &mut EmitterField,
    ) -> WordStats {
        let mut ctx = vello_cpu::RenderContext::new(64, 64);
        let mut painter = Painter::new(&mut ctx, 1.0);
        let mut shaper = TextShaper::new(FontBook::empty());
        r.draw(&mut painter, f, cache, &mut shaper, emitters, pass())
            .unwrap()
    }

    #[test]
    fn missing_keys_are_skipped_and_counted() {
        let a = ChunkKey::new(0, 0, 0);
        let b = ChunkKey::new(0, 0, 1);
        let mut r = WordRenderer::new();
        let mut emitters = EmitterField::default();
        let stats = run(
            &mut r,
            &frame(vec![chunk(a, EmitterKind::None), chunk(b, EmitterKind::None)]),
            &cache(&[a]),
            &mut emitters,
        );
        assert_eq!(stats.visible, 2);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!(r.missing_total(), 1);
    }

    #[test]
    fn emitter_fires_once_until_cleared() {
        let a = ChunkKey::new(1, 0, 0);
        let f = frame(vec![chunk(a, EmitterKind::Spark)]);
        let c = cache(&[a]);
        let mut r = WordRenderer::new();
        let mut emitters = EmitterField::default();

        assert_eq!(run(&mut r, &f, &c, &mut emitters).spawned, 1);
        assert_eq!(run(&mut r, &f, &c, &mut emitters).spawned, 0);
        assert!(r.has_fired(&a));

        r.clear_fired();
        assert_eq!(run(&mut r, &f, &c, &mut emitters).spawned, 1);
        assert_eq!(emitters.spawned(), 2);
    }

    #[test]
    fn font_sizes_follow_the_surface_scale() {
        let a = ChunkKey::new(0, 0, 0);
        let f = frame(vec![chunk(a, EmitterKind::Spark)]);
        let c = cache(&[a]);
        let mut r = WordRenderer::new();
        let mut emitters = EmitterField::default();
        let mut ctx = vello_cpu::RenderContext::new(64, 64);
        let mut painter = Painter::new(&mut ctx, 1.0);
        let mut shaper = TextShaper::new(FontBook::empty());
        let doubled = WordPass {
            size_scale: 2.0,
            ..pass()
        };
        let stats = r
            .draw(&mut painter, &f, &c, &mut shaper, &mut emitters, doubled)
            .unwrap();
        assert_eq!(stats.drawn, 1);
        // Emitters anchor 0.35 em above the baseline; the em is 32 px at twice the scale.
        let origin = emitters.emitters()[0].origin;
        assert!((origin.y - (40.0 - 32.0 * 0.35)).abs() < 1e-9, "{origin:?}");
    }

    #[test]
    fn hidden_chunks_are_ignored() {
        let a = ChunkKey::new(0, 0, 0);
        let mut hidden = chunk(a, EmitterKind::Ring);
        hidden.visible = false;
        let mut r = WordRenderer::new();
        let mut emitters = EmitterField::default();
        let stats = run(&mut r, &frame(vec![hidden]), &cache(&[a]), &mut emitters);
        assert_eq!(stats, WordStats::default());
        assert!(emitters.is_empty());
    }

    #[test]
    fn emitter_origin_follows_camera() {
        let a = ChunkKey::new(0, 0, 0);
        let mut f = frame(vec![chunk(a, EmitterKind::Ring)]);
        f.camera_x = 10.0;
        f.camera_y = -5.0;
        let mut r = WordRenderer::new();
        let mut emitters = EmitterField::default();
        run(&mut r, &f, &cache(&[a]), &mut emitters);
        let origin = emitters.emitters()[0].origin;
        assert!((origin.x - 42.0).abs() < 1e-9);
        assert!((origin.y - (35.0 - 16.0 * 0.35)).abs() < 1e-9);
    }

    #[test]
    fn camera_zoom_scales_around_center() {
        let mut f = frame(Vec::new());
        f.camera_zoom = 2.0;
        let size = LogicalSize::new(100.0, 100.0);
        let t = camera_affine(&f, size);
        let c = t * Point::new(50.0, 50.0);
        assert!((c.x - 50.0).abs() < 1e-9 && (c.y - 50.0).abs() < 1e-9);
        let p = t * Point::new(60.0, 50.0);
        assert!((p.x - 70.0).abs() < 1e-9);
    }
}
