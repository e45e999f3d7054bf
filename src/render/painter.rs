use kurbo::Shape as _;

use crate::foundation::core::{Affine, BezPath, Point, Rect};
use crate::scene::color::Color;
use crate::text::shaper::ShapedText;

/// Thin drawing layer over a vello_cpu render context.
///
/// Coordinates are logical pixels; the device pixel ratio is folded into the base transform.
/// `save`/`restore` bracket transform changes the way a 2D canvas does.
pub struct Painter<'a> {
    ctx: &'a mut vello_cpu::RenderContext,
    current: Affine,
    stack: Vec<Affine>,
    ops: u64,
}

impl<'a> Painter<'a> {
    /// Start painting with logical coordinates scaled by `dpr`.
    pub fn new(ctx: &'a mut vello_cpu::RenderContext, dpr: f64) -> Self {
        Self {
            ctx,
            current: Affine::scale(dpr),
            stack: Vec::new(),
            ops: 0,
        }
    }

    /// Push the current transform.
    pub fn save(&mut self) {
        self.stack.push(self.current);
    }

    /// Pop the transform pushed by the matching [`Painter::save`].
    pub fn restore(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.current = t;
        }
    }

    /// Post-multiply the current transform.
    pub fn transform(&mut self, t: Affine) {
        self.current *= t;
    }

    /// Current transform (logical to device).
    pub fn current_transform(&self) -> Affine {
        self.current
    }

    /// Draw calls issued so far.
    pub fn ops(&self) -> u64 {
        self.ops
    }

    /// Run `f` inside an opacity layer; skips the layer at full opacity and `f` at zero.
    pub fn with_opacity(&mut self, opacity: f64, f: impl FnOnce(&mut Self)) {
        let opacity = opacity.clamp(0.0, 1.0) as f32;
        if opacity <= 0.0 {
            return;
        }
        if opacity < 1.0 {
            self.ctx.push_opacity_layer(opacity);
        }
        f(self);
        if opacity < 1.0 {
            self.ctx.pop_layer();
        }
    }

    /// Fill a rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Color, opacity: f64) {
        if !self.prepare(color, opacity) {
            return;
        }
        self.ctx.fill_rect(&rect_to_cpu(rect));
    }

    /// Fill a circle.
    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Color, opacity: f64) {
        if radius <= 0.0 {
            return;
        }
        let path = kurbo::Circle::new(center, radius).to_path(0.1);
        self.fill_path(&path, color, opacity);
    }

    /// Fill an arbitrary path.
    pub fn fill_path(&mut self, path: &BezPath, color: Color, opacity: f64) {
        if !self.prepare(color, opacity) {
            return;
        }
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    /// Stroke a path by filling its outline.
    pub fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color, opacity: f64) {
        if width <= 0.0 {
            return;
        }
        let outline = kurbo::stroke(
            path.iter(),
            &kurbo::Stroke::new(width),
            &kurbo::StrokeOpts::default(),
            0.1,
        );
        self.fill_path(&outline, color, opacity);
    }

    /// Stroke a line segment.
    pub fn stroke_line(&mut self, a: Point, b: Point, width: f64, color: Color, opacity: f64) {
        let mut path = BezPath::new();
        path.move_to(a);
        path.line_to(b);
        self.stroke_path(&path, width, color, opacity);
    }

    /// Stroke a circle.
    pub fn stroke_circle(
        &mut self,
        center: Point,
        radius: f64,
        width: f64,
        color: Color,
        opacity: f64,
    ) {
        if radius <= 0.0 {
            return;
        }
        let path = kurbo::Circle::new(center, radius).to_path(0.1);
        self.stroke_path(&path, width, color, opacity);
    }

    /// Draw an image of `size` pixels stretched into `dst`.
    pub fn draw_image(&mut self, image: &vello_cpu::Image, size: (u32, u32), dst: Rect, opacity: f64) {
        let (w, h) = (f64::from(size.0.max(1)), f64::from(size.1.max(1)));
        if dst.width() <= 0.0 || dst.height() <= 0.0 {
            return;
        }
        let t = self.current
            * Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / w, dst.height() / h);
        self.with_opacity(opacity, |p| {
            p.ctx.set_transform(affine_to_cpu(t));
            p.ctx.set_paint(image.clone());
            p.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            p.ops += 1;
        });
    }

    /// Draw shaped text with its left edge at `origin.x` and baseline at `origin.y`.
    pub fn draw_text(
        &mut self,
        font: &vello_cpu::peniko::FontData,
        text: &ShapedText,
        origin: Point,
        color: Color,
        opacity: f64,
    ) {
        if text.runs.is_empty() || !self.prepare(color, opacity) {
            return;
        }
        let t = self.current * Affine::translate((origin.x, origin.y));
        self.ctx.set_transform(affine_to_cpu(t));
        for run in &text.runs {
            let glyphs = run.glyphs.iter().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            self.ctx
                .glyph_run(font)
                .font_size(run.font_size)
                .fill_glyphs(glyphs);
        }
    }

    fn prepare(&mut self, color: Color, opacity: f64) -> bool {
        let a = (color.a * opacity).clamp(0.0, 1.0);
        if a <= 0.0 {
            return false;
        }
        let [r, g, b, _] = color.to_rgba8();
        let a8 = (a * 255.0).round() as u8;
        self.ctx.set_transform(affine_to_cpu(self.current));
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a8));
        self.ops += 1;
        true
    }
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_restore_brackets_transforms() {
        let mut ctx = vello_cpu::RenderContext::new(8, 8);
        let mut p = Painter::new(&mut ctx, 2.0);
        let base = p.current_transform();
        p.save();
        p.transform(Affine::translate((3.0, 4.0)));
        assert_ne!(p.current_transform(), base);
        p.restore();
        assert_eq!(p.current_transform(), base);
        // Unbalanced restore is harmless.
        p.restore();
        assert_eq!(p.current_transform(), base);
    }

    #[test]
    fn transparent_fills_issue_no_ops() {
        let mut ctx = vello_cpu::RenderContext::new(8, 8);
        let mut p = Painter::new(&mut ctx, 1.0);
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE, 0.0);
        p.fill_circle(Point::new(1.0, 1.0), 0.0, Color::WHITE, 1.0);
        assert_eq!(p.ops(), 0);
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE, 1.0);
        assert_eq!(p.ops(), 1);
    }
}
