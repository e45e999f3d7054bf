use std::collections::HashMap;

use anyhow::Context as _;

use crate::compositor::sprites::{Sprite, sprite_from_premul};
use crate::foundation::error::{DanceError, DanceResult};
use crate::scene::color::Color;
use crate::timeline::keyframe::IconGlyph;

fn path_data(glyph: IconGlyph) -> &'static str {
    match glyph {
        IconGlyph::Heart => {
            "M12 21s-7.5-4.6-9.6-9.2C.9 8.4 2.8 4.5 6.6 4.5c2.2 0 3.7 1.3 4.4 2.6.7-1.3 2.2-2.6 4.4-2.6 3.8 0 5.7 3.9 4.2 7.3C19.5 16.4 12 21 12 21z"
        }
        IconGlyph::Star => "M12 2l2.9 6.6 7.1.6-5.4 4.7 1.6 7L12 17.3 5.8 20.9l1.6-7L2 9.2l7.1-.6z",
        IconGlyph::Flame => {
            "M12 2c1 3.5 5 5.8 5 10.5A5 5 0 0 1 7 12.5c0-2 1-3.5 2-4.5 0 2 1 3 2 3.5C11 8 10.5 5 12 2z"
        }
        IconGlyph::Note => "M9 3v11.3A3.5 3.5 0 1 0 11 17.5V8h6V3z",
        IconGlyph::Moon => "M15 2a10 10 0 1 0 7 17A8 8 0 0 1 15 2z",
        IconGlyph::Drop => "M12 2C9 7 6 10.5 6 14a6 6 0 0 0 12 0c0-3.5-3-7-6-12z",
        IconGlyph::Bolt => "M13 2L4 14h6l-1 8 9-12h-6z",
    }
}

/// SVG document for `glyph` filled with `color`.
pub fn icon_svg(glyph: IconGlyph, color: Color) -> String {
    let [r, g, b, _] = color.to_rgba8();
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><path fill="#{r:02x}{g:02x}{b:02x}" d="{}"/></svg>"##,
        path_data(glyph)
    )
}

/// Rasterize an SVG document to premultiplied RGBA8 at `size`x`size`.
pub fn rasterize_svg(svg: &str, size: u32) -> DanceResult<Vec<u8>> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts).context("parse icon svg")?;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| DanceError::render("failed to allocate icon pixmap"))?;
    let sx = (size as f32) / tree.size().width();
    let sy = (size as f32) / tree.size().height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap.data().to_vec())
}

/// Icon sprites keyed by glyph, pixel size and color.
#[derive(Debug, Default)]
pub struct IconAtlas {
    sprites: HashMap<(IconGlyph, u32, [u8; 4]), Sprite>,
}

impl IconAtlas {
    /// Sprite for `glyph` at roughly `size_px`, rasterized once per bucketed size.
    pub fn get(&mut self, glyph: IconGlyph, size_px: f64, color: Color) -> DanceResult<Sprite> {
        let px = bucket(size_px);
        let key = (glyph, px, color.to_rgba8());
        if let Some(s) = self.sprites.get(&key) {
            return Ok(s.clone());
        }
        let bytes = rasterize_svg(&icon_svg(glyph, color), px)?;
        let sprite = sprite_from_premul(&bytes, px, px)?;
        self.sprites.insert(key, sprite.clone());
        Ok(sprite)
    }

    /// Cached sprite count.
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

fn bucket(size_px: f64) -> u32 {
    let s = size_px.clamp(8.0, 512.0);
    ((s / 8.0).ceil() * 8.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_glyph_rasterizes_with_coverage() {
        for g in [
            IconGlyph::Heart,
            IconGlyph::Star,
            IconGlyph::Flame,
            IconGlyph::Note,
            IconGlyph::Moon,
            IconGlyph::Drop,
            IconGlyph::Bolt,
        ] {
            let px = rasterize_svg(&icon_svg(g, Color::WHITE), 32).unwrap();
            assert_eq!(px.len(), 32 * 32 * 4);
            assert!(px.chunks_exact(4).any(|p| p[3] > 0), "{g:?} drew nothing");
        }
    }

    #[test]
    fn atlas_buckets_sizes() {
        let mut atlas = IconAtlas::default();
        atlas.get(IconGlyph::Star, 30.0, Color::WHITE).unwrap();
        atlas.get(IconGlyph::Star, 31.5, Color::WHITE).unwrap();
        assert_eq!(atlas.len(), 1);
        atlas.get(IconGlyph::Star, 50.0, Color::WHITE).unwrap();
        assert_eq!(atlas.len(), 2);
    }
}
