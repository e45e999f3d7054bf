use crate::events::{ActiveEvent, EventKind};
use crate::foundation::core::{LogicalSize, Point};
use crate::foundation::ease::Ease;
use crate::render::painter::Painter;
use crate::scene::color::Color;

/// Closed-form opacity envelope of an event at progress `t` in `0..1`.
pub fn envelope(kind: EventKind, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    match kind {
        EventKind::LightBreak => {
            if t < 0.15 {
                Ease::OutCubic.apply(t / 0.15)
            } else {
                1.0 - Ease::InQuad.apply((t - 0.15) / 0.85)
            }
        }
        EventKind::WorldShift => (t * std::f64::consts::PI).sin(),
        EventKind::LensBreath => {
            let s = (t * std::f64::consts::TAU).sin();
            s * s
        }
        EventKind::VoidMoment => {
            if t < 0.3 {
                Ease::InOutSine.apply(t / 0.3)
            } else {
                1.0 - Ease::OutQuad.apply((t - 0.3) / 0.7)
            }
        }
        EventKind::HaloRing => 1.0 - t,
    }
}

/// Radius and stroke width of the halo ring at progress `t`, relative to the surface diagonal.
pub fn ring_geometry(t: f64, diagonal: f64) -> (f64, f64) {
    let e = Ease::OutExpo.apply(t);
    let radius = diagonal * 0.5 * e;
    let width = (diagonal * 0.02 * (1.0 - t)).max(0.0);
    (radius, width)
}

/// Draw one active event over the whole surface.
pub fn draw_event(painter: &mut Painter<'_>, ev: &ActiveEvent, now_ms: f64, size: LogicalSize, accent: Color) {
    let t = ev.progress(now_ms);
    let a = envelope(ev.kind, t) * ev.intensity;
    if a <= 0.0 {
        return;
    }
    let rect = size.rect();
    match ev.kind {
        EventKind::LightBreak => {
            painter.fill_rect(rect, accent.mix(Color::WHITE, 0.75), a * 0.55);
        }
        EventKind::WorldShift => {
            painter.fill_rect(rect, accent, a * 0.22);
            let band_y = size.height * Ease::InOutCubic.apply(t);
            let band = crate::foundation::core::Rect::new(
                0.0,
                band_y - size.height * 0.06,
                size.width,
                band_y + size.height * 0.06,
            );
            painter.fill_rect(band, accent.mix(Color::WHITE, 0.4), a * 0.18);
        }
        EventKind::LensBreath => {
            let c = size.center();
            let r = size.width.hypot(size.height) * 0.5;
            painter.stroke_circle(c, r, r * 0.6, Color::BLACK, a * 0.35);
        }
        EventKind::VoidMoment => {
            painter.fill_rect(rect, Color::BLACK, a * 0.7);
        }
        EventKind::HaloRing => {
            let (radius, width) = ring_geometry(t, size.width.hypot(size.height));
            painter.stroke_circle(Point::new(size.width * 0.5, size.height * 0.5), radius, width, accent.mix(Color::WHITE, 0.5), a * 0.8);
        }
    }
}
