use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::{AudioResource, PlayOutcome};
use crate::foundation::error::{DanceError, DanceResult};

#[derive(Debug)]
struct SteppedState {
    time: f64,
    duration: f64,
    playing: bool,
    muted: bool,
    looping: bool,
    ended: bool,
    released: bool,
    plays: u32,
}

/// Audio resource whose playhead only moves through [`SteppedAudio::advance`].
///
/// Clones share one playhead, so a test or an offline exporter can keep a handle after giving
/// the resource to a player.
#[derive(Clone, Debug)]
pub struct SteppedAudio {
    state: Arc<Mutex<SteppedState>>,
    source: Option<PathBuf>,
}

impl SteppedAudio {
    /// Stepped clock for media of `duration` seconds.
    pub fn new(duration: f64) -> DanceResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DanceError::audio("duration must be finite and > 0"));
        }
        Ok(Self {
            state: Arc::new(Mutex::new(SteppedState {
                time: 0.0,
                duration,
                playing: false,
                muted: false,
                looping: true,
                ended: false,
                released: false,
                plays: 0,
            })),
            source: None,
        })
    }

    /// Attach the audio file this clock stands in for.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, SteppedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the playhead forward by `dt` seconds if playing. Looping wraps; otherwise playback
    /// stops at the end and reports ended.
    pub fn advance(&self, dt: f64) {
        let mut s = self.state();
        if !s.playing || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        s.time += dt;
        if s.time >= s.duration {
            if s.looping {
                s.time = s.time.rem_euclid(s.duration);
            } else {
                s.time = s.duration;
                s.playing = false;
                s.ended = true;
            }
        }
    }

    /// Times `play` succeeded.
    pub fn play_count(&self) -> u32 {
        self.state().plays
    }

    /// Whether `release` was called.
    pub fn is_released(&self) -> bool {
        self.state().released
    }
}

impl AudioResource for SteppedAudio {
    fn play(&mut self) -> DanceResult<PlayOutcome> {
        let mut s = self.state();
        if s.released {
            return Err(DanceError::audio("audio resource was released"));
        }
        if s.ended {
            s.time = 0.0;
            s.ended = false;
        }
        s.playing = true;
        s.plays += 1;
        Ok(PlayOutcome::Started)
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn seek(&mut self, time_sec: f64) {
        let mut s = self.state();
        s.time = if time_sec.is_finite() { time_sec.clamp(0.0, s.duration) } else { 0.0 };
        s.ended = false;
    }

    fn current_time(&self) -> f64 {
        self.state().time
    }

    fn duration(&self) -> Option<f64> {
        Some(self.state().duration)
    }

    fn set_muted(&mut self, muted: bool) {
        self.state().muted = muted;
    }

    fn muted(&self) -> bool {
        self.state().muted
    }

    fn set_looping(&mut self, looping: bool) {
        self.state().looping = looping;
    }

    fn looping(&self) -> bool {
        self.state().looping
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn has_ended(&self) -> bool {
        self.state().ended
    }

    fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn release(&mut self) {
        let mut s = self.state();
        s.playing = false;
        s.released = true;
    }
}
