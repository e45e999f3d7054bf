use std::f64::consts::{PI, TAU};

use crate::foundation::core::{Point, Vec2};
use crate::foundation::ease::Ease;
use crate::foundation::math::{clamp01, unit_hash};
use crate::render::painter::Painter;
use crate::scene::color::Color;
use crate::timeline::keyframe::EmitterKind;
use crate::tuning;

/// One drawable piece of an emitter at a given instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EmitterPrimitive {
    /// Filled dot.
    Dot {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
        /// Opacity.
        alpha: f64,
        /// Drawn in black instead of the emitter color.
        dark: bool,
    },
    /// Stroked segment.
    Line {
        /// Start.
        a: Point,
        /// End.
        b: Point,
        /// Stroke width.
        width: f64,
        /// Opacity.
        alpha: f64,
    },
    /// Stroked circle.
    Ring {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
        /// Stroke width.
        width: f64,
        /// Opacity.
        alpha: f64,
    },
}

/// Lifetime of an emitter kind in seconds.
pub fn emitter_duration(kind: EmitterKind) -> f64 {
    match kind {
        EmitterKind::None => 0.0,
        EmitterKind::Spark | EmitterKind::Ring | EmitterKind::Trail => tuning::EMITTER_SHORT_SEC,
        EmitterKind::Frost
        | EmitterKind::Dust
        | EmitterKind::LightRays
        | EmitterKind::Converge
        | EmitterKind::Shimmer => tuning::EMITTER_MEDIUM_SEC,
        EmitterKind::Ember | EmitterKind::Coins | EmitterKind::Orbit | EmitterKind::DarkAbsorb => {
            tuning::EMITTER_LONG_SEC
        }
    }
}

fn particle_count(kind: EmitterKind, intensity: f64) -> u32 {
    let base = match kind {
        EmitterKind::None => 0.0,
        EmitterKind::Ring => 1.0,
        EmitterKind::LightRays => 10.0,
        EmitterKind::Spark | EmitterKind::Shimmer => 22.0,
        _ => 16.0,
    };
    if base <= 1.0 {
        return base as u32;
    }
    (base * (0.5 + 0.5 * clamp01(intensity))).round().max(4.0) as u32
}

/// A one-shot particle burst anchored where a word was drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WordEmitter {
    /// Emitter type.
    pub kind: EmitterKind,
    /// Screen-space anchor.
    pub origin: Point,
    /// Particle color.
    pub color: Color,
    /// Strength in `0..1`.
    pub intensity: f64,
    /// Host time it spawned at (ms).
    pub started_ms: f64,
    /// Lifetime in seconds.
    pub duration: f64,
    /// Per-emitter randomness seed.
    pub seed: u64,
}

impl WordEmitter {
    /// `elapsed / duration` clamped to `0..1`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        clamp01((now_ms - self.started_ms) / (self.duration * 1000.0))
    }

    /// Whether the emitter outlived `duration + grace`.
    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.started_ms > self.duration * 1000.0 + tuning::EPHEMERAL_GRACE_MS
    }

    /// Everything the emitter draws at `now_ms`; a pure function of progress and intensity.
    pub fn primitives(&self, now_ms: f64) -> Vec<EmitterPrimitive> {
        let t = self.progress(now_ms);
        let k = 0.4 + 0.6 * clamp01(self.intensity);
        let o = self.origin;
        let n = particle_count(self.kind, self.intensity);
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let u = unit_hash(self.seed, i);
            let v = unit_hash(self.seed, i + 1000);
            let dir = Vec2::new((u * TAU).cos(), (u * TAU).sin());
            let prim = match self.kind {
                EmitterKind::None => continue,
                EmitterKind::Ember => dot(
                    o + Vec2::new((t * 6.0 + u * TAU).sin() * 8.0, -t * 90.0 * (0.5 + v) * k),
                    2.0 + 2.0 * u,
                    1.0 - t,
                ),
                EmitterKind::Frost => dot(
                    o + dir * (Ease::OutCubic.apply(t) * 70.0 * (0.5 + v) * k),
                    1.5 + 1.5 * v,
                    1.0 - t,
                ),
                EmitterKind::Spark => dot(
                    o + dir * (Ease::OutExpo.apply(t) * 110.0 * (0.4 + v) * k),
                    0.5 + 1.5 * (1.0 - t),
                    (1.0 - t) * (1.0 - t),
                ),
                EmitterKind::Dust => dot(
                    o + Vec2::new(
                        (u - 0.5) * 2.0 * Ease::OutQuad.apply(t) * 80.0 * k,
                        -(t * PI).sin() * 20.0 * v,
                    ),
                    1.5 + 2.5 * v,
                    (1.0 - t) * 0.8,
                ),
                EmitterKind::LightRays => {
                    let start = 160.0 * k * (1.0 - Ease::InQuad.apply(t));
                    EmitterPrimitive::Line {
                        a: o + dir * start,
                        b: o + dir * (start + 30.0),
                        width: 1.5 + v,
                        alpha: (t * PI).sin(),
                    }
                }
                EmitterKind::Ring => EmitterPrimitive::Ring {
                    center: o,
                    radius: 10.0 + Ease::OutCubic.apply(t) * 90.0 * k,
                    width: 3.0 * (1.0 - t),
                    alpha: 1.0 - t,
                },
                EmitterKind::Coins => {
                    let secs = t * self.duration;
                    dot(
                        o + Vec2::new(
                            (u - 0.5) * 60.0,
                            -40.0 * v + 0.5 * tuning::COIN_GRAVITY * secs * secs,
                        ),
                        3.0,
                        1.0 - Ease::InQuad.apply(t),
                    )
                }
                EmitterKind::Orbit => {
                    let a = u * TAU + t * TAU * 1.5;
                    dot(
                        o + Vec2::new(a.cos(), a.sin()) * (30.0 + 20.0 * v),
                        2.0,
                        (t * PI).sin(),
                    )
                }
                EmitterKind::Trail => dot(
                    o + Vec2::new(-t * 120.0 * (0.3 + v) * k, (u - 0.5) * 10.0),
                    1.0 + 2.0 * (1.0 - t),
                    1.0 - t,
                ),
                EmitterKind::Converge => dot(
                    o + dir * ((1.0 - Ease::OutCubic.apply(t)) * 120.0 * (0.6 + v)),
                    1.5 + v,
                    clamp01(t * (1.0 - t) * 4.0),
                ),
                EmitterKind::DarkAbsorb => EmitterPrimitive::Dot {
                    center: o + dir * ((1.0 - Ease::InQuad.apply(t)) * 90.0 * (0.5 + v)),
                    radius: 3.0 + 3.0 * u,
                    alpha: 0.8 * (t * PI).sin(),
                    dark: true,
                },
                EmitterKind::Shimmer => dot(
                    o + Vec2::new((u - 0.5) * 80.0, (v - 0.5) * 30.0),
                    1.2 + v,
                    (t * PI * 6.0 + u * TAU).sin().max(0.0) * (1.0 - t),
                ),
            };
            out.push(prim);
        }
        out
    }
}

fn dot(center: Point, radius: f64, alpha: f64) -> EmitterPrimitive {
    EmitterPrimitive::Dot {
        center,
        radius,
        alpha,
        dark: false,
    }
}

/// Live word emitters.
#[derive(Clone, Debug, Default)]
pub struct EmitterField {
    emitters: Vec<WordEmitter>,
    spawned: u64,
}

impl EmitterField {
    /// Spawn an emitter; `EmitterKind::None` is ignored. Oldest emitters drop past the cap.
    pub fn spawn(&mut self, kind: EmitterKind, origin: Point, color: Color, intensity: f64, now_ms: f64) {
        if kind == EmitterKind::None {
            return;
        }
        self.spawned += 1;
        self.emitters.push(WordEmitter {
            kind,
            origin,
            color,
            intensity: clamp01(intensity),
            started_ms: now_ms,
            duration: emitter_duration(kind),
            seed: self.spawned.wrapping_mul(0x2545_F491_4F6C_DD1D),
        });
        if self.emitters.len() > tuning::MAX_EMITTERS {
            let excess = self.emitters.len() - tuning::MAX_EMITTERS;
            self.emitters.drain(..excess);
        }
    }

    /// Drop expired emitters.
    pub fn prune(&mut self, now_ms: f64) {
        self.emitters.retain(|e| !e.expired(now_ms));
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.emitters.clear();
    }

    /// Live emitters.
    pub fn emitters(&self) -> &[WordEmitter] {
        &self.emitters
    }

    /// Live emitter count.
    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    /// Return `true` when no emitter is live.
    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Total emitters spawned.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Draw every live emitter in screen space.
    pub fn draw(&self, painter: &mut Painter<'_>, now_ms: f64) {
        for e in &self.emitters {
            for p in e.primitives(now_ms) {
                match p {
                    EmitterPrimitive::Dot {
                        center,
                        radius,
                        alpha,
                        dark,
                    } => {
                        let c = if dark { Color::BLACK } else { e.color };
                        painter.fill_circle(center, radius, c, alpha);
                    }
                    EmitterPrimitive::Line { a, b, width, alpha } => {
                        painter.stroke_line(a, b, width, e.color, alpha);
                    }
                    EmitterPrimitive::Ring {
                        center,
                        radius,
                        width,
                        alpha,
                    } => painter.stroke_circle(center, radius, width, e.color, alpha),
                }
            }
        }
    }
}
