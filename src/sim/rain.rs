use crate::foundation::math::unit_hash;
use crate::scene::color::Color;
use crate::sim::{PixelSimulator, SimFrame, SimKind, SimStep};
use crate::tuning;

const GOLDEN: f64 = 0.618_033_988_749_895;

#[derive(Clone, Copy, Debug)]
struct Drop {
    x: f64,
    y: f64,
    speed: f64,
    len: f64,
}

/// Falling streaks over a near-black base.
pub struct RainSim {
    w: u32,
    h: u32,
    drops: Vec<Drop>,
    tint: Color,
    frame: SimFrame,
}

impl RainSim {
    /// Fixed drop set; phases are golden-ratio spaced so the pattern never visibly repeats.
    pub fn new(width: u32, height: u32, tint: Color) -> Self {
        let (w, h) = (width.max(1), height.max(1));
        let drops = (0..tuning::RAIN_DROPS)
            .map(|i| {
                let fi = i as f64;
                Drop {
                    x: (fi * GOLDEN).fract(),
                    y: (fi * GOLDEN * GOLDEN + 0.5 * unit_hash(17, i as u32)).fract(),
                    speed: 0.45 + 0.55 * unit_hash(29, i as u32),
                    len: 0.04 + 0.06 * unit_hash(31, i as u32),
                }
            })
            .collect();
        Self {
            w,
            h,
            drops,
            tint: tint.mix(Color::WHITE, 0.6),
            frame: SimFrame::new(w, h),
        }
    }

    fn clear(&mut self) {
        let base = Color::rgb(0.01, 0.012, 0.02).to_premul8(tuning::RAIN_BASE_ALPHA);
        for px in self.frame.rgba_premul.chunks_exact_mut(4) {
            px.copy_from_slice(&base);
        }
    }
}

impl PixelSimulator for RainSim {
    fn kind(&self) -> SimKind {
        SimKind::Rain
    }

    fn update(&mut self, step: &SimStep) {
        let boost = 1.0 + tuning::RAIN_BEAT_BOOST * step.beat_pulse.clamp(0.0, 1.0);
        for d in &mut self.drops {
            d.y += d.speed * step.dt * boost;
            if d.y > 1.0 + d.len {
                d.y -= 1.0 + d.len;
            }
        }

        self.clear();
        let h = f64::from(self.h);
        let alpha = 0.35 + 0.5 * step.intensity.clamp(0.0, 1.0);
        for i in 0..self.drops.len() {
            let d = self.drops[i];
            let x = ((d.x * f64::from(self.w)) as u32).min(self.w - 1);
            let head = d.y * h;
            let tail = (d.y - d.len) * h;
            let y0 = tail.floor().max(0.0) as u32;
            let y1 = (head.ceil().min(h - 1.0)).max(0.0) as u32;
            for y in y0..=y1 {
                let t = (f64::from(y) - tail) / (head - tail).max(1e-6);
                if !(0.0..=1.0).contains(&t) {
                    continue;
                }
                self.frame.put(x, y, self.tint.to_premul8(alpha * t));
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
    fn drops_fall_and_wrap() {
        let mut sim = RainSim::new(40, 40, Color::WHITE);
        let before: Vec<f64> = sim.drops.iter().map(|d| d.y).collect();
        let step = SimStep {
            time_sec: 0.0,
            dt: 0.1,
            beat_pulse: 0.0,
            intensity: 1.0,
        };
        sim.update(&step);
        for (d, y0) in sim.drops.iter().zip(&before) {
            assert!(d.y > *y0 || d.y < 0.5, "drop either fell or wrapped");
        }
        for _ in 0..200 {
            sim.update(&step);
        }
        assert!(sim.drops.iter().all(|d| d.y <= 1.0 + d.len));
    }

    #[test]
    fn initial_columns_are_spread() {
        let sim = RainSim::new(40, 40, Color::WHITE);
        let mut cols: Vec<u32> = sim.drops.iter().map(|d| (d.x * 40.0) as u32).collect();
        cols.sort_unstable();
        cols.dedup();
        assert!(cols.len() >= 30);
    }
}
