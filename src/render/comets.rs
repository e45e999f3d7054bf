use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::core::{LogicalSize, Point};
use crate::foundation::ease::Ease;
use crate::foundation::math::clamp01;
use crate::render::painter::Painter;
use crate::scene::color::Color;
use crate::text::shaper::TextShaper;
use crate::tuning;

const SPARKLES: usize = 4;

/// An externally fired flying comment.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentComet {
    /// Comment text.
    pub text: String,
    /// Enters from the left edge when `true`.
    pub from_left: bool,
    /// Vertical position as a fraction of the surface height.
    pub lane: f64,
    /// Host time it was fired at (ms).
    pub started_ms: f64,
    /// Flight time in seconds.
    pub duration: f64,
}

impl CommentComet {
    /// `elapsed / duration` clamped to `0..1`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        clamp01((now_ms - self.started_ms) / (self.duration * 1000.0))
    }

    /// Whether the comet outlived `duration + grace`.
    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.started_ms > self.duration * 1000.0 + tuning::EPHEMERAL_GRACE_MS
    }

    /// Head position at `now_ms` for a surface of `size`.
    pub fn head(&self, now_ms: f64, size: LogicalSize) -> Point {
        let p = flight_ease(self.progress(now_ms));
        let margin = tuning::COMET_MARGIN;
        let span = size.width + 2.0 * margin;
        let x = if self.from_left {
            -margin + p * span
        } else {
            size.width + margin - p * span
        };
        Point::new(x, size.height * self.lane)
    }

    /// Opacity at `now_ms`; never above [`tuning::COMET_PEAK_OPACITY`].
    pub fn opacity(&self, now_ms: f64) -> f64 {
        let t = self.progress(now_ms);
        let fade_in = Ease::OutQuad.apply(t / 0.12);
        let fade_out = Ease::OutQuad.apply((1.0 - t) / 0.2);
        tuning::COMET_PEAK_OPACITY * fade_in.min(fade_out)
    }
}

/// Three-phase horizontal travel: fast start, linear cruise, fast finish.
pub fn flight_ease(t: f64) -> f64 {
    let t = clamp01(t);
    if t < 0.2 {
        0.3 * Ease::OutQuad.apply(t / 0.2)
    } else if t < 0.8 {
        0.3 + 0.4 * (t - 0.2) / 0.6
    } else {
        0.7 + 0.3 * Ease::InQuad.apply((t - 0.8) / 0.2)
    }
}

/// Bounded queue of live comets.
#[derive(Debug)]
pub struct CometOverlay {
    comets: VecDeque<CommentComet>,
    rng: StdRng,
    fired: u64,
}

impl CometOverlay {
    /// Empty overlay with a seeded side/lane picker.
    pub fn new(seed: u64) -> Self {
        Self {
            comets: VecDeque::with_capacity(tuning::MAX_COMETS),
            rng: StdRng::seed_from_u64(seed),
            fired: 0,
        }
    }

    /// Launch a comet; the oldest is dropped when the queue is full.
    pub fn fire(&mut self, text: &str, now_ms: f64) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        while self.comets.len() >= tuning::MAX_COMETS {
            self.comets.pop_front();
        }
        let from_left = self.rng.gen_bool(0.5);
        let lane = self.rng.gen_range(0.15..0.85);
        self.comets.push_back(CommentComet {
            text: text.to_owned(),
            from_left,
            lane,
            started_ms: now_ms,
            duration: tuning::COMET_SEC,
        });
        self.fired += 1;
    }

    /// Drop expired comets.
    pub fn prune(&mut self, now_ms: f64) {
        self.comets.retain(|c| !c.expired(now_ms));
    }

    /// Live comets, oldest first.
    pub fn comets(&self) -> impl Iterator<Item = &CommentComet> {
        self.comets.iter()
    }

    /// Live comet count.
    pub fn len(&self) -> usize {
        self.comets.len()
    }

    /// Return `true` when no comet is live.
    pub fn is_empty(&self) -> bool {
        self.comets.is_empty()
    }

    /// Comets fired over the overlay's lifetime.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Draw trails, sparkles and text for every live comet.
    pub fn draw(
        &self,
        painter: &mut Painter<'_>,
        now_ms: f64,
        size: LogicalSize,
        accent: Color,
        shaper: &mut TextShaper,
    ) {
        for c in &self.comets {
            let a = c.opacity(now_ms);
            if a <= 0.0 {
                continue;
            }
            let head = c.head(now_ms, size);
            let back = if c.from_left { -1.0 } else { 1.0 };
            let tail = Point::new(head.x + back * tuning::COMET_TRAIL_PX, head.y);
            painter.stroke_line(tail, head, 2.0, accent, a * 0.6);
            painter.fill_circle(head, 4.0, Color::WHITE, a);

            let t = c.progress(now_ms);
            for j in 0..SPARKLES {
                let at = (j + 1) as f64 / (SPARKLES + 1) as f64;
                let passed = flight_ease(t) - at;
                if passed <= 0.0 {
                    continue;
                }
                let life = clamp01(1.0 - passed / 0.25);
                let x = if c.from_left {
                    -tuning::COMET_MARGIN + at * (size.width + 2.0 * tuning::COMET_MARGIN)
                } else {
                    size.width + tuning::COMET_MARGIN - at * (size.width + 2.0 * tuning::COMET_MARGIN)
                };
                let y = head.y + if j % 2 == 0 { -6.0 } else { 6.0 };
                painter.fill_circle(Point::new(x, y), 1.8, accent.mix(Color::WHITE, 0.5), a * life);
            }

            let font_size = tuning::COMET_FONT_PX;
            let Ok(shaped) = shaper.shape(&c.text, font_size) else {
                continue;
            };
            if let Some(font) = shaper.fonts().font_data() {
                let x = if c.from_left {
                    head.x - shaped.width - 10.0
                } else {
                    head.x + 10.0
                };
                painter.draw_text(font, &shaped, Point::new(x, head.y + font_size * 0.35), Color::WHITE, a);
            }
        }
    }
}
