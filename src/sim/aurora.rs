use crate::scene::color::Color;
use crate::sim::{PixelSimulator, SimFrame, SimKind, SimStep};
use crate::tuning;

const BANDS: usize = 4;

/// Analytic multi-band aurora. Each frame is a pure function of song time.
pub struct AuroraSim {
    w: u32,
    h: u32,
    colors: [Color; BANDS],
    frame: SimFrame,
}

impl AuroraSim {
    /// Four bands blending from `dominant` to `accent`.
    pub fn new(width: u32, height: u32, dominant: Color, accent: Color) -> Self {
        let (w, h) = (width.max(1), height.max(1));
        let colors = std::array::from_fn(|i| dominant.mix(accent, i as f64 / (BANDS - 1) as f64));
        Self {
            w,
            h,
            colors,
            frame: SimFrame::new(w, h),
        }
    }

    /// Brightness of band `b` at normalized `(u, v)` and time `t`.
    pub fn band_brightness(b: usize, u: f64, v: f64, t: f64) -> f64 {
        let bf = b as f64;
        let center = 0.22 + 0.13 * bf + 0.05 * (t * 0.3 + bf * 1.3).sin();
        let wave = 0.06 * (u * std::f64::consts::TAU * (1.0 + 0.35 * bf) + t * (0.6 + 0.2 * bf)).sin();
        let d = (v - (center + wave)) / tuning::AURORA_BAND_WIDTH;
        (-d * d).exp()
    }
}

impl PixelSimulator for AuroraSim {
    fn kind(&self) -> SimKind {
        SimKind::Aurora
    }

    fn update(&mut self, step: &SimStep) {
        let t = step.time_sec;
        let gain = 0.55 + 0.3 * step.intensity.clamp(0.0, 1.0) + 0.15 * step.beat_pulse.clamp(0.0, 1.0);
        for y in 0..self.h {
            let v = (f64::from(y) + 0.5) / f64::from(self.h);
            for x in 0..self.w {
                let u = (f64::from(x) + 0.5) / f64::from(self.w);
                let (mut r, mut g, mut b, mut a) = (0.0, 0.0, 0.0, 0.0);
                for (i, c) in self.colors.iter().enumerate() {
                    let k = Self::band_brightness(i, u, v, t) * gain;
                    r += c.r * k;
                    g += c.g * k;
                    b += c.b * k;
                    a += k;
                }
                let a = a.clamp(0.0, 1.0);
                let px = Color::rgba(r.min(1.0), g.min(1.0), b.min(1.0), 1.0);
                // Brightness already scales rgb, so store as premultiplied directly.
                let p = px.to_rgba8();
                let cap = (a * 255.0).round() as u8;
                self.frame.put(x, y, [p[0].min(cap), p[1].min(cap), p[2].min(cap), cap]);
            }
        }
        self.frame.generation += 1;
    }

    fn frame(&self) -> &SimFrame {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_depends_only_on_time() {
        let mut a = AuroraSim::new(24, 12, Color::WHITE, Color::rgb(0.2, 0.9, 0.5));
        let mut b = AuroraSim::new(24, 12, Color::WHITE, Color::rgb(0.2, 0.9, 0.5));
        let step = |t| SimStep {
            time_sec: t,
            dt: 0.05,
            beat_pulse: 0.0,
            intensity: 0.5,
        };
        a.update(&step(1.0));
        a.update(&step(3.0));
        b.update(&step(3.0));
        assert_eq!(a.frame().rgba_premul, b.frame().rgba_premul);
    }

    #[test]
    fn band_peaks_near_its_center() {
        let t = 0.0;
        let near = AuroraSim::band_brightness(0, 0.0, 0.22, t);
        let far = AuroraSim::band_brightness(0, 0.0, 0.9, t);
        assert!(near > 0.5);
        assert!(far < 0.01);
    }
}
