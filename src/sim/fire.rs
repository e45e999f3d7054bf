use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::scene::color::Color;
use crate::sim::{PixelSimulator, SimFrame, SimKind, SimStep};
use crate::tuning;

/// Upward heat-diffusion automaton shared by fire, ember and smoke.
///
/// The bottom row is re-seeded every step; every other cell relaxes toward the mean of the two
/// cells below it and the two lower diagonals, minus a per-mode cooling constant.
pub struct FireSim {
    kind: SimKind,
    w: usize,
    h: usize,
    heat: Vec<f32>,
    cooling: f32,
    palette: [[u8; 4]; 256],
    rng: StdRng,
    frame: SimFrame,
}

impl FireSim {
    /// New cold grid. `kind` must be fire, ember or smoke; anything else behaves like fire.
    pub fn new(kind: SimKind, width: u32, height: u32, seed: u64) -> Self {
        let (w, h) = (width.max(3) as usize, height.max(3) as usize);
        let cooling = match kind {
            SimKind::Ember => tuning::EMBER_COOLING,
            SimKind::Smoke => tuning::SMOKE_COOLING,
            _ => tuning::FIRE_COOLING,
        };
        Self {
            kind,
            w,
            h,
            heat: vec![0.0; w * h],
            cooling,
            palette: build_palette(kind),
            rng: StdRng::seed_from_u64(seed),
            frame: SimFrame::new(w as u32, h as u32),
        }
    }

    /// Heat at a cell in `0..1`.
    pub fn heat_at(&self, x: usize, y: usize) -> f32 {
        self.heat[y * self.w + x]
    }

    fn seed_bottom(&mut self, intensity: f32, pulse: f32) {
        let row = (self.h - 1) * self.w;
        let gain = intensity * (0.65 + 0.35 * pulse);
        for x in 0..self.w {
            let spark: f32 = self.rng.r#gen();
            self.heat[row + x] = (spark * gain * 1.25).min(1.0);
        }
    }

    fn relax(&mut self) {
        let (w, h) = (self.w, self.h);
        for y in 0..h - 1 {
            let below = (y + 1) * w;
            let below2 = (y + 2).min(h - 1) * w;
            for x in 0..w {
                let l = x.saturating_sub(1);
                let r = (x + 1).min(w - 1);
                let avg = (self.heat[below + l]
                    + self.heat[below + x]
                    + self.heat[below + r]
                    + self.heat[below2 + x])
                    * 0.25;
                self.heat[y * w + x] = (avg - self.cooling).max(0.0);
            }
        }
    }

    fn render(&mut self) {
        for y in 0..self.h {
            for x in 0..self.w {
                let h = self.heat[y * self.w + x];
                let idx = (h * 255.0).round().clamp(0.0, 255.0) as usize;
                self.frame.put(x as u32, y as u32, self.palette[idx]);
            }
        }
        self.frame.generation += 1;
    }
}

impl PixelSimulator for FireSim {
    fn kind(&self) -> SimKind {
        self.kind
    }

    fn update(&mut self, step: &SimStep) {
        self.seed_bottom(step.intensity.clamp(0.0, 1.0) as f32, step.beat_pulse.clamp(0.0, 1.0) as f32);
        self.relax();
        self.render();
    }

    fn frame(&self) -> &SimFrame {
        &self.frame
    }
}

/// 256-entry heat-to-color table (premultiplied).
fn build_palette(kind: SimKind) -> [[u8; 4]; 256] {
    let stops: &[(f64, Color)] = match kind {
        SimKind::Ember => &[
            (0.0, Color::rgba(0.0, 0.0, 0.0, 0.0)),
            (0.3, Color::rgba(0.35, 0.02, 0.0, 0.6)),
            (0.7, Color::rgba(0.85, 0.25, 0.02, 0.9)),
            (1.0, Color::rgba(1.0, 0.6, 0.2, 1.0)),
        ],
        SimKind::Smoke => &[
            (0.0, Color::rgba(0.0, 0.0, 0.0, 0.0)),
            (0.4, Color::rgba(0.18, 0.18, 0.2, 0.45)),
            (1.0, Color::rgba(0.6, 0.6, 0.64, 0.85)),
        ],
        _ => &[
            (0.0, Color::rgba(0.0, 0.0, 0.0, 0.0)),
            (0.2, Color::rgba(0.4, 0.0, 0.0, 0.5)),
            (0.45, Color::rgba(0.9, 0.2, 0.0, 0.85)),
            (0.7, Color::rgba(1.0, 0.6, 0.05, 1.0)),
            (1.0, Color::rgba(1.0, 0.97, 0.8, 1.0)),
        ],
    };
    let mut out = [[0u8; 4]; 256];
    for (i, px) in out.iter_mut().enumerate() {
        let t = i as f64 / 255.0;
        let hi = stops.iter().position(|(s, _)| *s >= t).unwrap_or(stops.len() - 1);
        let c = if hi == 0 {
            stops[0].1
        } else {
            let (s0, c0) = stops[hi - 1];
            let (s1, c1) = stops[hi];
            c0.mix(c1, (t - s0) / (s1 - s0).max(1e-9))
        };
        *px = c.to_premul8(1.0);
    }
    out
}
