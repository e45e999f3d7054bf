//! One-shot scripted overlays gated by song progress.

pub mod overlay;

use smallvec::SmallVec;

use crate::scene::model::CinematicDirection;
use crate::tuning;

/// Emotional event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Bright flash at the climax.
    LightBreak,
    /// Color wash at the middle chapter.
    WorldShift,
    /// Early edge darkening that breathes in and out.
    LensBreath,
    /// Near-black dip at the most intense chapter.
    VoidMoment,
    /// Expanding ring near the end.
    HaloRing,
}

impl EventKind {
    /// Duration in seconds.
    pub fn duration_sec(self) -> f64 {
        match self {
            Self::LightBreak => tuning::LIGHT_BREAK_SEC,
            Self::WorldShift => tuning::WORLD_SHIFT_SEC,
            Self::LensBreath => tuning::LENS_BREATH_SEC,
            Self::VoidMoment => tuning::VOID_MOMENT_SEC,
            Self::HaloRing => tuning::HALO_RING_SEC,
        }
    }
}

/// A candidate event.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionalEvent {
    /// Type.
    pub kind: EventKind,
    /// Song-progress ratio it fires at.
    pub trigger_ratio: f64,
    /// Strength in `0..1`.
    pub intensity: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Whether it already fired.
    pub triggered: bool,
}

impl EmotionalEvent {
    fn new(kind: EventKind, trigger_ratio: f64, intensity: f64) -> Self {
        Self {
            kind,
            trigger_ratio: trigger_ratio.clamp(0.0, 1.0),
            intensity: intensity.clamp(0.0, 1.0),
            duration: kind.duration_sec(),
            triggered: false,
        }
    }
}

/// A fired event being drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveEvent {
    /// Type.
    pub kind: EventKind,
    /// Strength in `0..1`.
    pub intensity: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Host time it fired at (ms).
    pub started_ms: f64,
}

impl ActiveEvent {
    /// `elapsed / duration`, clamped to `0..1`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.started_ms) / (self.duration * 1000.0)).clamp(0.0, 1.0)
    }

    fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.started_ms > self.duration * 1000.0 + tuning::EPHEMERAL_GRACE_MS
    }
}

/// Derive the candidate events from cinematic direction.
///
/// Without direction there are no events.
pub fn derive_events(direction: Option<&CinematicDirection>) -> SmallVec<[EmotionalEvent; 5]> {
    let mut out = SmallVec::new();
    let Some(dir) = direction else {
        return out;
    };

    if let Some(climax) = &dir.climax {
        out.push(EmotionalEvent::new(
            EventKind::LightBreak,
            climax.time_ratio,
            climax.max_intensity,
        ));
    }
    if dir.chapters.len() >= 3 {
        let mid = &dir.chapters[dir.chapters.len() / 2];
        out.push(EmotionalEvent::new(
            EventKind::WorldShift,
            mid.start_ratio,
            mid.emotional_intensity.max(0.5),
        ));
    }
    out.push(EmotionalEvent::new(
        EventKind::LensBreath,
        tuning::LENS_BREATH_RATIO,
        0.6,
    ));
    if let Some(i) = dir.most_intense_chapter() {
        let ch = &dir.chapters[i];
        out.push(EmotionalEvent::new(
            EventKind::VoidMoment,
            ch.start_ratio,
            ch.emotional_intensity,
        ));
    }
    out.push(EmotionalEvent::new(
        EventKind::HaloRing,
        tuning::HALO_RING_RATIO,
        0.8,
    ));
    out
}

/// Fires candidate events once each and tracks the active ones.
#[derive(Clone, Debug, Default)]
pub struct EventScheduler {
    events: SmallVec<[EmotionalEvent; 5]>,
    active: Vec<ActiveEvent>,
    tolerance: f64,
    fired_total: u32,
}

impl EventScheduler {
    /// Schedule `events` with a trigger tolerance (in progress ratio).
    pub fn new(events: SmallVec<[EmotionalEvent; 5]>, tolerance: f64) -> Self {
        Self {
            events,
            active: Vec::new(),
            tolerance: tolerance.max(0.0),
            fired_total: 0,
        }
    }

    /// Candidate events.
    pub fn events(&self) -> &[EmotionalEvent] {
        &self.events
    }

    /// Events currently drawn.
    pub fn active(&self) -> &[ActiveEvent] {
        &self.active
    }

    /// Events fired over the scheduler's lifetime.
    pub fn fired_total(&self) -> u32 {
        self.fired_total
    }

    /// Arm every event again and drop the active ones, for a new pass over the song.
    ///
    /// `fired_total` keeps counting across passes.
    pub fn rearm(&mut self) {
        for e in &mut self.events {
            e.triggered = false;
        }
        self.active.clear();
    }

    /// Fire due events for `ratio` and prune expired ones. Returns how many fired.
    pub fn update(&mut self, ratio: f64, now_ms: f64) -> usize {
        let mut fired = 0;
        for e in &mut self.events {
            if e.triggered || (ratio - e.trigger_ratio).abs() > self.tolerance {
                continue;
            }
            e.triggered = true;
            self.active.push(ActiveEvent {
                kind: e.kind,
                intensity: e.intensity,
                duration: e.duration,
                started_ms: now_ms,
            });
            tracing::debug!(kind = ?e.kind, ratio, "emotional event fired");
            fired += 1;
        }
        self.fired_total += fired as u32;
        self.active.retain(|a| !a.expired(now_ms));
        fired
    }
}
