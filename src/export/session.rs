use crate::encode::sink::{FrameSink, SinkConfig};
use crate::export::{ExportOutcome, ExportRatio, OpenedExport, StopReason};
use crate::foundation::core::{Fps, FrameIndex, LogicalSize};
use crate::foundation::error::DanceResult;
use crate::render::surface::FrameRGBA;

/// Player state pinned by an export and put back when it stops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestoreState {
    /// Audio loop flag before the export.
    pub looping: bool,
    /// Logical surface size before the export.
    pub size: LogicalSize,
    /// Device pixel ratio before the export.
    pub dpr: f64,
}

/// One running export.
///
/// Frames are paced by audio time: each capture pushes as many copies of the current surface as
/// the export frame rate says are due, so the video stays aligned with the soundtrack even when
/// ticks arrive late or early.
pub struct ExportSession {
    ratio: ExportRatio,
    file_name: String,
    sink: Box<dyn FrameSink>,
    fps: Fps,
    frames: u64,
    restore: RestoreState,
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("ratio", &self.ratio)
            .field("file_name", &self.file_name)
            .field("frames", &self.frames)
            .finish()
    }
}

/// Upper bound on frames pushed by a single capture after a stall.
const MAX_CATCH_UP_SECS: u64 = 10;

impl ExportSession {
    /// Begin the sink and start counting frames.
    pub fn start(
        opened: OpenedExport,
        ratio: ExportRatio,
        cfg: SinkConfig,
        restore: RestoreState,
    ) -> DanceResult<Self> {
        let OpenedExport { mut sink, file_name } = opened;
        let fps = cfg.fps;
        sink.begin(cfg)?;
        Ok(Self {
            ratio,
            file_name,
            sink,
            fps,
            frames: 0,
            restore,
        })
    }

    /// Export ratio.
    pub fn ratio(&self) -> ExportRatio {
        self.ratio
    }

    /// Frames pushed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// State to restore on stop.
    pub fn restore(&self) -> RestoreState {
        self.restore
    }

    /// Frames due at `elapsed_sec` into the export that were not pushed yet.
    pub fn frames_due(&self, elapsed_sec: f64) -> u64 {
        if !elapsed_sec.is_finite() || elapsed_sec < 0.0 {
            return 0;
        }
        let target = (elapsed_sec * self.fps.as_f64()).floor() as u64 + 1;
        target.saturating_sub(self.frames)
    }

    /// Push the due copies of `frame`. Returns how many were pushed.
    pub fn capture(&mut self, frame: &FrameRGBA, elapsed_sec: f64) -> DanceResult<u64> {
        let cap = MAX_CATCH_UP_SECS * u64::from(self.fps.num.div_ceil(self.fps.den));
        let due = self.frames_due(elapsed_sec);
        if due > cap {
            tracing::warn!(due, cap, "export fell behind; dropping catch-up frames");
        }
        let due = due.min(cap);
        for _ in 0..due {
            self.sink.push_frame(FrameIndex(self.frames), frame)?;
            self.frames += 1;
        }
        Ok(due)
    }

    /// Finalize the sink and describe the run.
    pub fn finish(mut self, reason: StopReason) -> ExportOutcome {
        let error = self.sink.end().err().map(|e| e.to_string());
        if let Some(e) = &error {
            tracing::error!(error = %e, file = %self.file_name, "export finalize failed");
        }
        ExportOutcome {
            ratio: self.ratio,
            path: self.sink.output_path().map(|p| p.to_path_buf()),
            file_name: self.file_name,
            frames: self.frames,
            reason,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportTarget, MemoryExportTarget};

    fn session(target: &mut MemoryExportTarget) -> ExportSession {
        let opened = target.open(ExportRatio::Square, "a", "b").unwrap();
        ExportSession::start(
            opened,
            ExportRatio::Square,
            SinkConfig {
                width: 2,
                height: 2,
                fps: Fps::new(10, 1).unwrap(),
                bitrate_kbps: 100,
                audio: None,
            },
            RestoreState {
                looping: true,
                size: LogicalSize::new(4.0, 4.0),
                dpr: 1.0,
            },
        )
        .unwrap()
    }

    fn frame() -> FrameRGBA {
        FrameRGBA {
            width: 2,
            height: 2,
            data: vec![0; 16],
            premultiplied: true,
        }
    }

    #[test]
    fn capture_paces_by_elapsed_time() {
        let mut target = MemoryExportTarget::new();
        let mut s = session(&mut target);
        assert_eq!(s.capture(&frame(), 0.0).unwrap(), 1);
        assert_eq!(s.capture(&frame(), 0.05).unwrap(), 0);
        assert_eq!(s.capture(&frame(), 0.35).unwrap(), 3);
        assert_eq!(s.frames(), 4);
        let out = s.finish(StopReason::Requested);
        assert_eq!(out.frames, 4);
        assert!(out.error.is_none());
        let idx: Vec<u64> = target.captured().frames().iter().map(|(i, _)| i.0).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
    }

    #[test]
    fn negative_elapsed_captures_nothing() {
        let mut target = MemoryExportTarget::new();
        let s = session(&mut target);
        assert_eq!(s.frames_due(-1.0), 0);
        assert_eq!(s.frames_due(f64::NAN), 0);
    }
}
