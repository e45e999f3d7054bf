//! Low-resolution background simulations.
//!
//! Every simulator owns a fixed grid independent of the display resolution and renders into a
//! premultiplied RGBA8 buffer the compositor stretches over the surface at partial opacity.

pub mod aurora;
pub mod fire;
pub mod rain;
pub mod water;

use crate::scene::color::Color;
use crate::tuning;

/// Simulation system a chapter or scene asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimKind {
    /// Rising flames.
    Fire,
    /// Slow, lingering glow.
    Ember,
    /// Fast-dissipating grey plumes.
    Smoke,
    /// Wave-equation ripples.
    Water,
    /// Analytic aurora bands.
    Aurora,
    /// Falling streaks.
    Rain,
    /// No simulation.
    None,
}

impl SimKind {
    /// Map a free-form directive (physics system, chapter background or atmosphere) to a kind.
    pub fn from_directive(s: &str) -> Self {
        let s = s.to_ascii_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| s.contains(w));
        if has(&["ember", "coal", "glow"]) {
            Self::Ember
        } else if has(&["smoke", "fog", "haze", "mist", "ash"]) {
            Self::Smoke
        } else if has(&["fire", "flame", "burn", "inferno", "blaze"]) {
            Self::Fire
        } else if has(&["water", "ocean", "sea", "wave", "ripple", "river", "lake"]) {
            Self::Water
        } else if has(&["aurora", "northern", "sky", "cosmic", "night", "star"]) {
            Self::Aurora
        } else if has(&["rain", "storm", "drizzle", "downpour"]) {
            Self::Rain
        } else {
            Self::None
        }
    }
}

/// Inputs for one simulation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimStep {
    /// Song time in seconds.
    pub time_sec: f64,
    /// Seconds since the previous step (clamped).
    pub dt: f64,
    /// Beat pulse in `0..1`.
    pub beat_pulse: f64,
    /// Effect intensity in `0..1`.
    pub intensity: f64,
}

/// A simulator's rendered grid.
#[derive(Clone, Debug)]
pub struct SimFrame {
    /// Grid width in pixels.
    pub width: u32,
    /// Grid height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major.
    pub rgba_premul: Vec<u8>,
    /// Bumped on every step; lets consumers skip re-uploading an unchanged frame.
    pub generation: u64,
}

impl SimFrame {
    /// Transparent frame of the given grid size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba_premul: vec![0; (width as usize) * (height as usize) * 4],
            generation: 0,
        }
    }

    pub(crate) fn put(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.rgba_premul[i..i + 4].copy_from_slice(&px);
    }
}

/// A fixed-resolution pixel simulation.
pub trait PixelSimulator: Send {
    /// Which system this is.
    fn kind(&self) -> SimKind;
    /// Advance one step and re-render the grid.
    fn update(&mut self, step: &SimStep);
    /// Latest rendered grid.
    fn frame(&self) -> &SimFrame;
}

/// Build the simulator for `kind`, colored from the scene palette.
pub fn make_simulator(
    kind: SimKind,
    dominant: Color,
    accent: Color,
    seed: u64,
) -> Option<Box<dyn PixelSimulator>> {
    let (w, h) = (tuning::SIM_GRID_W, tuning::SIM_GRID_H);
    match kind {
        SimKind::Fire | SimKind::Ember | SimKind::Smoke => {
            Some(Box::new(fire::FireSim::new(kind, w, h, seed)))
        }
        SimKind::Water => Some(Box::new(water::WaterSim::new(w, h, dominant, accent, seed))),
        SimKind::Aurora => Some(Box::new(aurora::AuroraSim::new(w, h, dominant, accent))),
        SimKind::Rain => Some(Box::new(rain::RainSim::new(w, h, accent))),
        SimKind::None => None,
    }
}

/// The simulators a scene needs, stepped at a capped rate.
pub struct SimulatorSet {
    sims: Vec<Box<dyn PixelSimulator>>,
    rate_hz: f64,
    last_index: Option<i64>,
    last_time: Option<f64>,
    steps: u64,
}

impl std::fmt::Debug for SimulatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorSet")
            .field("kinds", &self.kinds())
            .field("rate_hz", &self.rate_hz)
            .field("steps", &self.steps)
            .finish()
    }
}

impl SimulatorSet {
    /// One simulator per distinct kind in `kinds` (`None` entries ignored).
    pub fn new(
        kinds: impl IntoIterator<Item = SimKind>,
        dominant: Color,
        accent: Color,
        seed: u64,
        rate_hz: f64,
    ) -> Self {
        let mut sims: Vec<Box<dyn PixelSimulator>> = Vec::new();
        for (i, kind) in kinds.into_iter().enumerate() {
            if sims.iter().any(|s| s.kind() == kind) {
                continue;
            }
            if let Some(sim) = make_simulator(kind, dominant, accent, seed.wrapping_add(i as u64))
            {
                sims.push(sim);
            }
        }
        Self {
            sims,
            rate_hz: if rate_hz.is_finite() && rate_hz > 0.0 {
                rate_hz
            } else {
                tuning::SIM_RATE_HZ
            },
            last_index: None,
            last_time: None,
            steps: 0,
        }
    }

    /// Kinds present, in creation order.
    pub fn kinds(&self) -> Vec<SimKind> {
        self.sims.iter().map(|s| s.kind()).collect()
    }

    /// Total steps taken.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Step `active` if the coarse frame index for `time_sec` changed since the last step.
    ///
    /// Returns `true` when a step ran.
    pub fn advance(&mut self, active: SimKind, time_sec: f64, beat_pulse: f64, intensity: f64) -> bool {
        let index = (time_sec * self.rate_hz).floor() as i64;
        if self.last_index == Some(index) {
            return false;
        }
        let Some(sim) = self.sims.iter_mut().find(|s| s.kind() == active) else {
            return false;
        };
        let nominal = 1.0 / self.rate_hz;
        let dt = self
            .last_time
            .map_or(nominal, |t| (time_sec - t).abs())
            .clamp(0.0, nominal * 4.0);
        sim.update(&SimStep {
            time_sec,
            dt,
            beat_pulse,
            intensity,
        });
        self.last_index = Some(index);
        self.last_time = Some(time_sec);
        self.steps += 1;
        true
    }

    /// Latest frame of `kind`, if present.
    pub fn frame(&self, kind: SimKind) -> Option<&SimFrame> {
        self.sims.iter().find(|s| s.kind() == kind).map(|s| s.frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_map_to_kinds() {
        assert_eq!(SimKind::from_directive("Burning embers"), SimKind::Ember);
        assert_eq!(SimKind::from_directive("wildfire"), SimKind::Fire);
        assert_eq!(SimKind::from_directive("smoky haze"), SimKind::Smoke);
        assert_eq!(SimKind::from_directive("ocean waves"), SimKind::Water);
        assert_eq!(SimKind::from_directive("aurora"), SimKind::Aurora);
        assert_eq!(SimKind::from_directive("heavy rain"), SimKind::Rain);
        assert_eq!(SimKind::from_directive("plain"), SimKind::None);
    }

    #[test]
    fn set_dedups_kinds_and_skips_none() {
        let set = SimulatorSet::new(
            [SimKind::Fire, SimKind::None, SimKind::Fire, SimKind::Rain],
            Color::WHITE,
            Color::BLACK,
            1,
            20.0,
        );
        assert_eq!(set.kinds(), vec![SimKind::Fire, SimKind::Rain]);
    }

    #[test]
    fn advance_is_rate_limited() {
        let mut set = SimulatorSet::new([SimKind::Aurora], Color::WHITE, Color::BLACK, 1, 10.0);
        assert!(set.advance(SimKind::Aurora, 0.00, 0.0, 1.0));
        assert!(!set.advance(SimKind::Aurora, 0.05, 0.0, 1.0));
        assert!(set.advance(SimKind::Aurora, 0.10, 0.0, 1.0));
        assert!(!set.advance(SimKind::Fire, 0.50, 0.0, 1.0));
        assert_eq!(set.steps(), 2);
        assert_eq!(set.frame(SimKind::Aurora).unwrap().generation, 2);
    }
}
