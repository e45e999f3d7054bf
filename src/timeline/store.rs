use crate::foundation::core::LogicalSize;
use crate::foundation::error::{DanceError, DanceResult};
use crate::timeline::keyframe::BakedKeyframe;

/// Baked keyframes ordered by time, plus the scale currently applied to their positions.
///
/// Positions are baked against a reference logical size. Resizing never re-bakes: it undoes the
/// applied scale and applies the new one in place.
#[derive(Clone, Debug)]
pub struct Timeline {
    frames: Vec<BakedKeyframe>,
    reference: LogicalSize,
    applied: (f64, f64),
}

impl Timeline {
    /// Wrap baked keyframes (at reference scale).
    ///
    /// Rejects non-finite times and times that go backwards.
    pub fn new(frames: Vec<BakedKeyframe>, reference: LogicalSize) -> DanceResult<Self> {
        if !reference.is_valid() {
            return Err(DanceError::validation(
                "timeline reference size must be finite and > 0",
            ));
        }
        let mut prev = f64::NEG_INFINITY;
        for (i, f) in frames.iter().enumerate() {
            if !f.time_ms.is_finite() {
                return Err(DanceError::validation(format!(
                    "keyframe {i} has non-finite time"
                )));
            }
            if f.time_ms < prev {
                return Err(DanceError::validation(format!(
                    "keyframe {i} time {} precedes previous {prev}",
                    f.time_ms
                )));
            }
            prev = f.time_ms;
        }
        Ok(Self {
            frames,
            reference,
            applied: (1.0, 1.0),
        })
    }

    /// Number of keyframes.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Return `true` when there are no keyframes.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Borrow all keyframes.
    pub fn frames(&self) -> &[BakedKeyframe] {
        &self.frames
    }

    /// Reference logical size the baker used.
    pub fn reference(&self) -> LogicalSize {
        self.reference
    }

    /// Scale currently applied to positional fields.
    pub fn applied_scale(&self) -> (f64, f64) {
        self.applied
    }

    /// Uniform factor for non-positional sizes (font sizes, radii).
    pub fn size_scale(&self) -> f64 {
        self.applied.0.min(self.applied.1)
    }

    /// Index of the latest keyframe with `time_ms <= query`.
    ///
    /// Queries before the first keyframe resolve to index 0. `None` only for an empty timeline.
    pub fn index_at(&self, time_ms: f64) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let n = self.frames.partition_point(|f| f.time_ms <= time_ms);
        Some(n.saturating_sub(1))
    }

    /// Keyframe for `time_ms` with nearest-preceding semantics (no interpolation).
    pub fn get_frame(&self, time_ms: f64) -> Option<&BakedKeyframe> {
        self.index_at(time_ms).map(|i| &self.frames[i])
    }

    /// Rescale positions in place for a new logical surface size.
    pub fn rescale_to(&mut self, size: LogicalSize) -> DanceResult<()> {
        if !size.is_valid() {
            return Err(DanceError::validation(
                "rescale target size must be finite and > 0",
            ));
        }
        let target = (
            size.width / self.reference.width,
            size.height / self.reference.height,
        );
        if target == self.applied {
            return Ok(());
        }
        unscale_timeline(&mut self.frames, self.applied.0, self.applied.1);
        scale_timeline(&mut self.frames, target.0, target.1);
        self.applied = target;
        Ok(())
    }
}

/// Multiply every positional field by `(sx, sy)`.
pub fn scale_timeline(frames: &mut [BakedKeyframe], sx: f64, sy: f64) {
    for f in frames {
        f.camera_x *= sx;
        f.camera_y *= sy;
        for c in &mut f.chunks {
            c.x *= sx;
            c.y *= sy;
        }
        for p in &mut f.particles {
            p.x *= sx;
            p.y *= sy;
        }
    }
}

/// Inverse of [`scale_timeline`].
pub fn unscale_timeline(frames: &mut [BakedKeyframe], sx: f64, sy: f64) {
    scale_timeline(frames, 1.0 / sx, 1.0 / sy);
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/store.rs"]
mod tests;
