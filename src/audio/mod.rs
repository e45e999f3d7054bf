//! Audio resource seam.
//!
//! The audio resource is the clock: every frame re-reads [`AudioResource::current_time`] instead
//! of accumulating frame deltas.

pub mod clock;
pub mod stepped;

use std::path::Path;

use crate::foundation::error::DanceResult;

pub use clock::WallClockAudio;
pub use stepped::SteppedAudio;

/// Result of a play request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayOutcome {
    /// Playback is running.
    Started,
    /// The host refused to start audible playback (autoplay policy); unmuting retries.
    Blocked,
}

/// Playback control the player drives.
pub trait AudioResource: Send {
    /// Start or resume playback.
    fn play(&mut self) -> DanceResult<PlayOutcome>;
    /// Pause playback, keeping the position.
    fn pause(&mut self);
    /// Move the playhead. Implementations may clamp to their own duration.
    fn seek(&mut self, time_sec: f64);
    /// Playhead position in seconds.
    fn current_time(&self) -> f64;
    /// Media duration in seconds, when known.
    fn duration(&self) -> Option<f64>;
    /// Mute or unmute.
    fn set_muted(&mut self, muted: bool);
    /// Whether output is muted.
    fn muted(&self) -> bool;
    /// Enable or disable looping at the media end.
    fn set_looping(&mut self, looping: bool);
    /// Whether looping is enabled.
    fn looping(&self) -> bool;
    /// Whether the playhead is advancing.
    fn is_playing(&self) -> bool;
    /// Whether playback reached the media end without looping.
    fn has_ended(&self) -> bool;
    /// Audio file backing this resource, if any.
    fn source(&self) -> Option<&Path> {
        None
    }
    /// Stop playback and drop any held media. Further calls are no-ops.
    fn release(&mut self);
}
