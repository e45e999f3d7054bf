use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::compositor::chapters::ChapterBlend;
use crate::compositor::sprites::{Sprite, premultiply_in_place, sprite_from_premul, vignette_bytes};
use crate::foundation::core::Rect;
use crate::foundation::error::DanceResult;
use crate::foundation::math::{clamp01, identity_hash, lerp};
use crate::render::painter::Painter;
use crate::scene::color::Color;
use crate::tuning;

/// A decoded chapter cover.
#[derive(Clone, Debug)]
pub struct CoverImage {
    /// Source file.
    pub path: PathBuf,
    /// Paintable image.
    pub sprite: Sprite,
    /// Mean luminance in `0..1`.
    pub luminance: f64,
}

/// Chapter cover images with cached luminance.
///
/// Unreadable or undecodable images are treated as absent.
#[derive(Debug, Default)]
pub struct CoverLibrary {
    covers: Vec<Option<CoverImage>>,
    luminance: HashMap<u64, f64>,
    vignette: Option<Sprite>,
    samples: usize,
}

impl CoverLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the covers with `paths`, reusing cached luminance for identical image bytes.
    pub fn load(&mut self, paths: &[PathBuf]) {
        let covers: Vec<Option<CoverImage>> = paths.iter().map(|p| self.load_one(p)).collect();
        self.covers = covers;
        let loaded = self.covers.iter().flatten().count();
        if !paths.is_empty() {
            tracing::debug!(requested = paths.len(), loaded, "chapter covers loaded");
        }
    }

    /// Build the radial vignette for a surface size.
    pub fn rebuild_vignette(&mut self, width: u32, height: u32) -> DanceResult<()> {
        let (w, h) = (
            width.clamp(1, tuning::VIGNETTE_MAX_PX),
            height.clamp(1, tuning::VIGNETTE_MAX_PX),
        );
        self.vignette = Some(sprite_from_premul(
            &vignette_bytes(w, h, tuning::VIGNETTE_STRENGTH),
            w,
            h,
        )?);
        Ok(())
    }

    /// Return `true` when at least one cover decoded.
    pub fn has_any(&self) -> bool {
        self.covers.iter().any(Option::is_some)
    }

    /// Cover for chapter `i`.
    pub fn get(&self, i: usize) -> Option<&CoverImage> {
        self.covers.get(i).and_then(Option::as_ref)
    }

    /// Luminance downsamples performed (cache misses).
    pub fn luminance_samples(&self) -> usize {
        self.samples
    }

    /// Draw the cover crossfade followed by the crush overlay and the vignette.
    ///
    /// Returns `false` (drawing nothing) when no chapter involved in `blend` has a cover.
    pub fn draw(&self, painter: &mut Painter<'_>, blend: ChapterBlend, rect: Rect) -> bool {
        let cur = self.get(blend.current);
        let next = if blend.frac > 0.0 {
            self.get(blend.next)
        } else {
            None
        };
        if cur.is_none() && next.is_none() {
            return false;
        }

        let base = tuning::COVER_OPACITY;
        if let Some(c) = cur {
            let fade = if next.is_some() { 1.0 - blend.frac } else { 1.0 };
            painter.draw_image(&c.sprite.image, c.sprite.size(), cover_fit(&c.sprite, rect), base * fade);
        }
        if let Some(n) = next {
            painter.draw_image(
                &n.sprite.image,
                n.sprite.size(),
                cover_fit(&n.sprite, rect),
                base * blend.frac,
            );
        }

        let lum = lerp(
            cur.map_or(0.0, |c| c.luminance),
            next.map_or(cur.map_or(0.0, |c| c.luminance), |n| n.luminance),
            blend.frac,
        );
        painter.fill_rect(rect, Color::BLACK, crush_alpha(lum));
        if let Some(v) = &self.vignette {
            painter.draw_image(&v.image, v.size(), rect, 1.0);
        }
        true
    }

    fn load_one(&mut self, path: &Path) -> Option<CoverImage> {
        match self.decode(path) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "chapter cover unavailable");
                None
            }
        }
    }

    fn decode(&mut self, path: &Path) -> anyhow::Result<CoverImage> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read cover '{}'", path.display()))?;
        let img = image::load_from_memory(&bytes).context("decode image from memory")?;
        let id = identity_hash(&bytes);
        let luminance = match self.luminance.get(&id) {
            Some(l) => *l,
            None => {
                let l = mean_luminance(&img);
                self.samples += 1;
                self.luminance.insert(id, l);
                l
            }
        };

        let max = tuning::COVER_MAX_PX;
        let img = if img.width() > max || img.height() > max {
            img.resize(max, max, image::imageops::FilterType::Triangle)
        } else {
            img
        };
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        let mut data = rgba.into_raw();
        premultiply_in_place(&mut data);
        Ok(CoverImage {
            path: path.to_path_buf(),
            sprite: sprite_from_premul(&data, w, h)?,
            luminance,
        })
    }
}

/// Opacity of the dark overlay for an image of luminance `lum`.
pub fn crush_alpha(lum: f64) -> f64 {
    clamp01(tuning::CRUSH_BASE + tuning::CRUSH_GAIN * clamp01(lum))
}

fn mean_luminance(img: &image::DynamicImage) -> f64 {
    let n = tuning::LUMINANCE_SAMPLE_PX;
    let thumb = img.thumbnail_exact(n, n).to_rgba8();
    let mut sum = 0.0;
    let mut count = 0.0;
    for px in thumb.pixels() {
        let [r, g, b, a] = px.0;
        let c = Color::from_rgb8(r, g, b);
        let w = f64::from(a) / 255.0;
        sum += c.luminance() * w;
        count += w;
    }
    if count > 0.0 { sum / count } else { 0.0 }
}

fn cover_fit(sprite: &Sprite, rect: Rect) -> Rect {
    let (iw, ih) = (f64::from(sprite.width), f64::from(sprite.height));
    let s = (rect.width() / iw).max(rect.height() / ih);
    let (w, h) = (iw * s, ih * s);
    let x = rect.x0 + (rect.width() - w) * 0.5;
    let y = rect.y0 + (rect.height() - h) * 0.5;
    Rect::new(x, y, x + w, y + h)
}
