use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::audio::{AudioResource, PlayOutcome};
use crate::foundation::error::{DanceError, DanceResult};

/// Audio resource driven by the monotonic wall clock.
///
/// No sound is produced; the playhead advances in real time while playing. With
/// `block_unmuted_autoplay` set, an unmuted `play` before any unmute gesture reports
/// [`PlayOutcome::Blocked`], the way browsers gate autoplay.
#[derive(Debug)]
pub struct WallClockAudio {
    source: Option<PathBuf>,
    duration: f64,
    base: f64,
    started: Option<Instant>,
    muted: bool,
    looping: bool,
    block_unmuted_autoplay: bool,
    gesture: bool,
    released: bool,
}

impl WallClockAudio {
    /// Clock for media of `duration` seconds.
    pub fn new(duration: f64) -> DanceResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DanceError::audio("duration must be finite and > 0"));
        }
        Ok(Self {
            source: None,
            duration,
            base: 0.0,
            started: None,
            muted: false,
            looping: true,
            block_unmuted_autoplay: false,
            gesture: false,
            released: false,
        })
    }

    /// Attach the audio file this clock stands in for.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Refuse unmuted playback until the first unmute.
    pub fn with_autoplay_block(mut self) -> Self {
        self.block_unmuted_autoplay = true;
        self
    }

    fn raw_position(&self) -> f64 {
        let elapsed = self.started.map_or(0.0, |t| t.elapsed().as_secs_f64());
        self.base + elapsed
    }

    fn freeze(&mut self) {
        self.base = self.current_time();
        self.started = None;
    }
}

impl AudioResource for WallClockAudio {
    fn play(&mut self) -> DanceResult<PlayOutcome> {
        if self.released {
            return Err(DanceError::audio("audio resource was released"));
        }
        if self.block_unmuted_autoplay && !self.muted && !self.gesture {
            tracing::debug!("unmuted autoplay blocked");
            return Ok(PlayOutcome::Blocked);
        }
        if self.has_ended() {
            self.base = 0.0;
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        Ok(PlayOutcome::Started)
    }

    fn pause(&mut self) {
        if self.started.is_some() {
            self.freeze();
        }
    }

    fn seek(&mut self, time_sec: f64) {
        let t = if time_sec.is_finite() { time_sec.clamp(0.0, self.duration) } else { 0.0 };
        self.base = t;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn current_time(&self) -> f64 {
        let raw = self.raw_position();
        if self.looping {
            raw.rem_euclid(self.duration)
        } else {
            raw.min(self.duration)
        }
    }

    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn set_muted(&mut self, muted: bool) {
        if !muted {
            self.gesture = true;
        }
        self.muted = muted;
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_looping(&mut self, looping: bool) {
        if self.looping != looping {
            let now = self.current_time();
            self.base = now;
            if self.started.is_some() {
                self.started = Some(Instant::now());
            }
        }
        self.looping = looping;
    }

    fn looping(&self) -> bool {
        self.looping
    }

    fn is_playing(&self) -> bool {
        self.started.is_some() && !self.has_ended()
    }

    fn has_ended(&self) -> bool {
        !self.looping && self.raw_position() >= self.duration
    }

    fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn release(&mut self) {
        if !self.released {
            self.freeze();
            self.released = true;
        }
    }
}
