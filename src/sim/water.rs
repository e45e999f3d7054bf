use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::math::clamp01;
use crate::scene::color::Color;
use crate::sim::{PixelSimulator, SimFrame, SimKind, SimStep};
use crate::tuning;

/// Damped 2D wave equation over two alternating height buffers.
pub struct WaterSim {
    w: usize,
    h: usize,
    prev: Vec<f32>,
    cur: Vec<f32>,
    dominant: Color,
    accent: Color,
    rng: StdRng,
    beat_armed: bool,
    frame: SimFrame,
}

impl WaterSim {
    /// Flat water tinted between `dominant` (troughs) and `accent` (crests).
    pub fn new(width: u32, height: u32, dominant: Color, accent: Color, seed: u64) -> Self {
        let (w, h) = (width.max(3) as usize, height.max(3) as usize);
        Self {
            w,
            h,
            prev: vec![0.0; w * h],
            cur: vec![0.0; w * h],
            dominant,
            accent,
            rng: StdRng::seed_from_u64(seed),
            beat_armed: true,
            frame: SimFrame::new(w as u32, h as u32),
        }
    }

    /// Drop a disturbance of `amp` at a cell.
    pub fn disturb(&mut self, x: usize, y: usize, amp: f32) {
        let (x, y) = (x.clamp(1, self.w - 2), y.clamp(1, self.h - 2));
        self.cur[y * self.w + x] += amp;
    }

    /// Sum of absolute heights (wave energy proxy).
    pub fn energy(&self) -> f32 {
        self.cur.iter().map(|v| v.abs()).sum()
    }

    fn propagate(&mut self) {
        let (w, h) = (self.w, self.h);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let i = y * w + x;
                let n = (self.cur[i - 1] + self.cur[i + 1] + self.cur[i - w] + self.cur[i + w])
                    * 0.5
                    - self.prev[i];
                self.prev[i] = n * tuning::WATER_DAMPING;
            }
        }
        std::mem::swap(&mut self.prev, &mut self.cur);
    }

    fn render(&mut self) {
        for y in 0..self.h {
            for x in 0..self.w {
                let v = f64::from(self.cur[y * self.w + x]);
                let shade = clamp01(0.5 + v * 2.0);
                let alpha = clamp01(0.35 + v.abs() * 3.0);
                let c = self.dominant.scaled(0.45).mix(self.accent, shade);
                self.frame.put(x as u32, y as u32, c.with_alpha(1.0).to_premul8(alpha));
            }
        }
        self.frame.generation += 1;
    }
}

impl PixelSimulator for WaterSim {
    fn kind(&self) -> SimKind {
        SimKind::Water
    }

    fn update(&mut self, step: &SimStep) {
        let intensity = step.intensity.clamp(0.0, 1.0) as f32;
        if self.rng.r#gen::<f32>() < tuning::WATER_DROP_CHANCE {
            let x = self.rng.gen_range(1..self.w - 1);
            let y = self.rng.gen_range(1..self.h - 1);
            let amp = self.rng.gen_range(0.05..0.2) * intensity;
            self.disturb(x, y, amp);
        }
        if step.beat_pulse > tuning::WATER_BEAT_THRESHOLD {
            if self.beat_armed {
                let amp = tuning::WATER_BEAT_AMPLITUDE * (0.5 + 0.5 * intensity);
                self.disturb(self.w / 2, self.h / 2, amp);
                self.beat_armed = false;
            }
        } else {
            self.beat_armed = true;
        }
        self.propagate();
        self.render();
    }

    fn frame(&self) -> &SimFrame {
        &self.frame
    }
}
