use std::collections::HashMap;
use std::sync::Arc;

use crate::chunks::cache::{TextMeasure, approx_width};
use crate::foundation::error::{DanceError, DanceResult};
use crate::text::fonts::FontBook;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct GlyphBrush;

/// One positioned glyph, relative to the text's left edge and baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    /// Glyph id in the font.
    pub id: u32,
    /// X offset from the left edge.
    pub x: f32,
    /// Y offset from the baseline.
    pub y: f32,
}

/// Glyphs of one shaped run.
#[derive(Clone, Debug)]
pub struct ShapedRun {
    /// Font size the run was shaped at.
    pub font_size: f32,
    /// Glyphs in visual order.
    pub glyphs: Vec<PlacedGlyph>,
}

/// Shaped single-line text, ready to draw.
#[derive(Clone, Debug)]
pub struct ShapedText {
    /// Advance width in logical px.
    pub width: f64,
    /// Runs in visual order.
    pub runs: Vec<ShapedRun>,
}

/// Parley-backed shaper with a per-(text, size) cache.
pub struct TextShaper {
    fonts: FontBook,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
    family: Option<String>,
    cache: HashMap<(String, u32), Arc<ShapedText>>,
}

impl std::fmt::Debug for TextShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextShaper")
            .field("fonts", &self.fonts)
            .field("family", &self.family)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl TextShaper {
    /// Register the font book's font with a fresh Parley context.
    pub fn new(fonts: FontBook) -> Self {
        let mut font_ctx = parley::FontContext::default();
        let family = fonts.bytes().and_then(|bytes| {
            let families = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
            let id = families.first().map(|(id, _)| *id)?;
            font_ctx.collection.family_name(id).map(str::to_owned)
        });
        if fonts.is_loaded() && family.is_none() {
            tracing::warn!("font bytes registered no family; using fallback text metrics");
        }
        Self {
            fonts,
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family,
            cache: HashMap::new(),
        }
    }

    /// Font used for drawing.
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Return `true` when real shaping is available.
    pub fn can_shape(&self) -> bool {
        self.family.is_some() && self.fonts.is_loaded()
    }

    /// Shape `text` at `size_px`, caching the result.
    pub fn shape(&mut self, text: &str, size_px: f64) -> DanceResult<Arc<ShapedText>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(DanceError::validation(
                "text size must be finite and > 0",
            ));
        }
        let key = (text.to_owned(), (size_px as f32).to_bits());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }
        let shaped = Arc::new(self.shape_uncached(text, size_px as f32)?);
        self.cache.insert(key, shaped.clone());
        Ok(shaped)
    }

    /// Drop cached shapes.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn shape_uncached(&mut self, text: &str, size_px: f32) -> DanceResult<ShapedText> {
        let Some(family) = self.family.clone() else {
            return Ok(ShapedText {
                width: approx_width(text, f64::from(size_px)),
                runs: Vec::new(),
            });
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(GlyphBrush));

        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);

        let mut runs = Vec::new();
        let mut baseline: Option<f32> = None;
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs: Vec<PlacedGlyph> = run
                    .positioned_glyphs()
                    .map(|g| PlacedGlyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                let base = *baseline.get_or_insert_with(|| glyphs.first().map_or(0.0, |g| g.y));
                runs.push(ShapedRun {
                    font_size: run.run().font_size(),
                    glyphs: glyphs
                        .into_iter()
                        .map(|g| PlacedGlyph { y: g.y - base, ..g })
                        .collect(),
                });
            }
        }

        Ok(ShapedText {
            width: f64::from(layout.width()),
            runs,
        })
    }
}

impl TextMeasure for TextShaper {
    fn measure(&mut self, text: &str, font_size: f64) -> (f64, bool) {
        if !self.can_shape() {
            return (approx_width(text, font_size), false);
        }
        match self.shape(text, font_size) {
            Ok(s) => (s.width, true),
            Err(e) => {
                tracing::debug!(error = %e, "shaping failed; using fallback width");
                (approx_width(text, font_size), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_font_measures_with_fallback() {
        let mut s = TextShaper::new(FontBook::empty());
        assert!(!s.can_shape());
        let (w, measured) = s.measure("abcd", 10.0);
        assert!(!measured);
        assert!((w - approx_width("abcd", 10.0)).abs() < 1e-9);
    }

    #[test]
    fn shape_rejects_bad_sizes_and_caches() {
        let mut s = TextShaper::new(FontBook::empty());
        assert!(s.shape("x", 0.0).is_err());
        let a = s.shape("hey", 20.0).unwrap();
        let b = s.shape("hey", 20.0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.runs.is_empty());
    }
}
