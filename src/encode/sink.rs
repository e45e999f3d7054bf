use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::DanceResult;
use crate::render::surface::FrameRGBA;

/// Configuration provided to a [`FrameSink`] when an export starts.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Target video bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Optional soundtrack muxed into the output.
    pub audio: Option<AudioTrack>,
}

/// Soundtrack input for sinks that mux audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Audio file (any format ffmpeg decodes).
    pub path: PathBuf,
    /// Seconds into the file where the export window starts.
    pub offset_sec: f64,
}

/// Sink contract for consuming captured frames in capture order.
///
/// `push_frame` is called with strictly increasing [`FrameIndex`] values between `begin` and
/// `end`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> DanceResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> DanceResult<()>;
    /// Called once after the last frame; finalizes the output.
    fn end(&mut self) -> DanceResult<()>;
    /// File the sink writes, if any.
    fn output_path(&self) -> Option<&Path> {
        None
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Whether `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> DanceResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> DanceResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> DanceResult<()> {
        self.ended = true;
        Ok(())
    }
}
